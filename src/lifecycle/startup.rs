//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the TLS credential (fatal on failure)
//! - Build the server for the configured forwarding mode
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is returned and ends the process
//! - The credential is parsed once and shared by every connection

use std::path::Path;

use thiserror::Error;

use crate::config::{ForwardMode, TerminatorConfig};
use crate::http::{ForwardError, HttpServer};
use crate::lifecycle::Shutdown;
use crate::net::{Listener, ListenerError, TlsCredential, TlsError, TunnelServer};

/// Fatal errors that stop the process.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load TLS credential: {0}")]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Forward(#[from] ForwardError),

    #[error("tunnel listener failed: {0}")]
    Listener(#[from] ListenerError),

    #[error("HTTPS server failed: {0}")]
    Serve(#[from] std::io::Error),
}

/// Run the terminator in the configured mode until `shutdown` fires.
pub async fn run(config: TerminatorConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    let credential = TlsCredential::load(
        Path::new(&config.tls.cert_path),
        Path::new(&config.tls.key_path),
    )?;

    tracing::info!(
        certificate = %config.tls.cert_path,
        key = %config.tls.key_path,
        listen = %config.listener.bind_address,
        backend = %config.backend_address(),
        mode = %config.mode,
        "TLS credential loaded"
    );

    match config.mode {
        ForwardMode::Http => {
            let server = HttpServer::new(&config)?;
            server.run(&credential, shutdown.subscribe()).await?;
        }
        ForwardMode::Tunnel => {
            let listener = Listener::bind(&config.listener).await?;
            let server = TunnelServer::new(listener, &credential, &config);
            server.run(shutdown.subscribe()).await?;
        }
    }

    Ok(())
}
