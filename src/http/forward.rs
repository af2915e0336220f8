//! Backend request forwarding.
//!
//! # Responsibilities
//! - Rebuild each inbound request against the backend (method, filtered headers, body)
//! - Make exactly one attempt; redirects are returned, never followed
//! - Rewrite backend redirects, copy headers and status, then relay the body
//!
//! # Error Mapping
//! - Inbound body unreadable → local 500, backend not contacted
//! - Backend URI/request cannot be built, or backend unreachable → local 502
//! - Backend body fails after the status is committed → the partial body is
//!   kept and the 500 message is appended after it. The client sees the
//!   backend's status with a truncated body; the status cannot be changed
//!   once committed.

use std::error::Error as StdError;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use hyper::body::Incoming;
use http_body_util::BodyExt;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

use crate::config::TimeoutConfig;
use crate::http::observer::ResponseObserver;
use crate::http::request::{backend_uri, filter_forwarded_headers};
use crate::http::response::{rewrite_location_headers, BackendOrigin};
use crate::resilience::with_deadline;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid backend address: {0}")]
    Backend(#[from] url::ParseError),
}

/// Relays inbound requests to a single plaintext HTTP backend.
pub struct RequestForwarder {
    client: Client<HttpConnector, Body>,
    backend: String,
    origin: BackendOrigin,
    request_timeout: Option<Duration>,
}

impl RequestForwarder {
    pub fn new(backend: &str, timeouts: &TimeoutConfig) -> Result<Self, ForwardError> {
        let backend = backend.strip_suffix('/').unwrap_or(backend).to_string();
        let origin = BackendOrigin::parse(&backend)?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(timeouts.connect());
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            backend,
            origin,
            request_timeout: timeouts.request(),
        })
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Forward `request` and write the outcome into `out`.
    pub async fn forward(&self, request: Request<Body>, out: &mut ResponseObserver) {
        let (parts, body) = request.into_parts();

        let body = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let message = error_chain(&e);
                tracing::warn!(error = %message, "Failed to read request body");
                out.local_error(StatusCode::INTERNAL_SERVER_ERROR, &message);
                return;
            }
        };

        let uri = match backend_uri(&self.backend, &parts.uri) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(error = %e, uri = %parts.uri, "Failed to build backend URI");
                out.local_error(StatusCode::BAD_GATEWAY, &e.to_string());
                return;
            }
        };

        let mut builder = Request::builder().method(parts.method.clone()).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            *headers = filter_forwarded_headers(&parts.headers);
        }
        let backend_request = match builder.body(Body::from(body)) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build backend request");
                out.local_error(StatusCode::BAD_GATEWAY, &e.to_string());
                return;
            }
        };

        let response: Response<Incoming> = match with_deadline(self.request_timeout, self.client.request(backend_request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let message = error_chain(&e);
                tracing::warn!(backend = %self.backend, error = %message, "Backend request failed");
                out.local_error(StatusCode::BAD_GATEWAY, &message);
                return;
            }
            Err(_) => {
                tracing::warn!(backend = %self.backend, "Backend request timed out");
                out.local_error(StatusCode::BAD_GATEWAY, "backend request timed out");
                return;
            }
        };

        let (mut head, mut body) = response.into_parts();
        rewrite_location_headers(&mut head.headers, &self.origin);
        for (name, value) in &head.headers {
            out.headers_mut().append(name.clone(), value.clone());
        }
        out.write_header(head.status);

        while let Some(frame) = body.frame().await {
            match frame {
                Ok(frame) => {
                    if let Ok(data) = frame.into_data() {
                        out.write(&data);
                    }
                }
                Err(e) => {
                    let message = error_chain(&e);
                    tracing::warn!(
                        backend = %self.backend,
                        bytes_relayed = out.bytes_written(),
                        error = %message,
                        "Backend body read failed after status was sent"
                    );
                    out.local_error(StatusCode::INTERNAL_SERVER_ERROR, &message);
                    return;
                }
            }
        }
    }
}

/// `error: cause: cause` rendering, hyper errors are terse on their own.
/// Wrappers that repeat their source's message are collapsed.
fn error_chain(error: &dyn StdError) -> String {
    let mut last = error.to_string();
    let mut message = last.clone();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if text != last {
            message.push_str(": ");
            message.push_str(&text);
            last = text;
        }
        source = cause.source();
    }
    message
}
