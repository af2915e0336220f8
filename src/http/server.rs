//! HTTPS server setup.
//!
//! # Responsibilities
//! - Create the Axum Router that sends every path and method to the forwarder
//! - Terminate TLS (HTTP/1.1 and HTTP/2 via ALPN) with axum-server, under the
//!   configured handshake deadline only
//! - Wrap each exchange with a ResponseObserver and an AccessLogEntry
//! - Drain in-flight requests on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use axum_server::Handle;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::TerminatorConfig;
use crate::http::access_log::AccessLogEntry;
use crate::http::forward::{ForwardError, RequestForwarder};
use crate::http::observer::ResponseObserver;
use crate::net::tls::TlsCredential;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<RequestForwarder>,
}

/// HTTPS front end for HTTP-mode forwarding.
pub struct HttpServer {
    router: Router,
    bind_address: String,
    handshake_timeout: Option<Duration>,
    handle: Handle,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &TerminatorConfig) -> Result<Self, ForwardError> {
        let forwarder = RequestForwarder::new(config.backend_address(), &config.timeouts)?;
        let state = AppState {
            forwarder: Arc::new(forwarder),
        };

        Ok(Self {
            router: Self::build_router(state),
            bind_address: config.listener.bind_address.clone(),
            handshake_timeout: config.timeouts.handshake(),
            handle: Handle::new(),
        })
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The router without the TLS listener, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Server handle; `listening()` resolves to the bound address.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// Serve HTTPS until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, credential: &TlsCredential, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self
            .bind_address
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let signal_handle = self.handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received, draining HTTP server");
            signal_handle.graceful_shutdown(None);
        });

        let listening = self.handle.clone();
        tokio::spawn(async move {
            if let Some(local) = listening.listening().await {
                tracing::info!(address = %local, "HTTPS server listening");
            }
        });

        axum_server::bind(addr)
            .acceptor(credential.http_acceptor(self.handshake_timeout))
            .handle(self.handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward one request, then log it. The log line is written on every path.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let entry = AccessLogEntry::start(request.method(), request.uri());
    let mut observer = ResponseObserver::new();

    state.forwarder.forward(request, &mut observer).await;

    entry.finish(&observer).emit();
    observer.into_response()
}
