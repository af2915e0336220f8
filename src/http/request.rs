//! Request preparation for the backend.
//!
//! # Responsibilities
//! - Decide which inbound headers reach the backend
//! - Build the backend URI from the configured base and the original request URI
//!
//! # Design Decisions
//! - `Host` and `Origin` describe the client's connection, not the backend's;
//!   they are dropped and the backend client sets its own `Host`
//! - Everything else passes through untouched, multi-value order included
//! - The request URI is appended verbatim, never re-encoded

use axum::http::{header, HeaderMap, HeaderName, Uri};

/// Headers never forwarded to the backend.
pub const CONNECTION_IDENTITY_HEADERS: [HeaderName; 2] = [header::HOST, header::ORIGIN];

/// Copy every inbound header except `Host` and `Origin`.
pub fn filter_forwarded_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if CONNECTION_IDENTITY_HEADERS.contains(name) {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }
    forwarded
}

/// `backend` + the original path and query.
pub fn backend_uri(backend: &str, original: &Uri) -> Result<Uri, axum::http::uri::InvalidUri> {
    let request_uri = original
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    format!("{}{}", backend, request_uri).parse()
}
