//! Response writer that records what was actually sent.
//!
//! The forwarder writes headers, a status and body bytes into a
//! [`ResponseObserver`], which remembers the status and the byte count for the
//! access log and finally turns into the axum response handed to the client.
//!
//! Status handling is an explicit state machine:
//!
//! ```text
//! Unset ──write_header(code)──▶ Explicit(code)
//!   │
//!   └──write(bytes)───────────▶ Implicit(200)
//! ```
//!
//! Once the status leaves `Unset` it is committed; later `write_header` calls
//! are superfluous and ignored.

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::{Bytes, BytesMut};

/// Committed status of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusState {
    /// Nothing written yet.
    Unset,
    /// A body write happened before any status was set.
    Implicit(StatusCode),
    /// The status was set with `write_header`.
    Explicit(StatusCode),
}

#[derive(Debug)]
pub struct ResponseObserver {
    headers: HeaderMap,
    status: StatusState,
    body: BytesMut,
    bytes_written: usize,
}

impl Default for ResponseObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseObserver {
    pub fn new() -> Self {
        Self {
            headers: HeaderMap::new(),
            status: StatusState::Unset,
            body: BytesMut::new(),
            bytes_written: 0,
        }
    }

    /// Headers sent with the response.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn status_state(&self) -> StatusState {
        self.status
    }

    /// True once a status has been committed.
    pub fn is_committed(&self) -> bool {
        self.status != StatusState::Unset
    }

    /// Commit `status`. Only the first call has any effect.
    pub fn write_header(&mut self, status: StatusCode) {
        match self.status {
            StatusState::Unset => self.status = StatusState::Explicit(status),
            StatusState::Implicit(current) | StatusState::Explicit(current) => {
                tracing::warn!(
                    current = current.as_u16(),
                    ignored = status.as_u16(),
                    "Superfluous status write ignored"
                );
            }
        }
    }

    /// Append body bytes, committing an implicit 200 if no status was set.
    pub fn write(&mut self, chunk: &[u8]) -> usize {
        if self.status == StatusState::Unset {
            self.status = StatusState::Implicit(StatusCode::OK);
        }
        self.body.extend_from_slice(chunk);
        self.bytes_written += chunk.len();
        chunk.len()
    }

    /// Reply with a plain-text error. If the status is already committed, only
    /// the message is appended after whatever has been written.
    pub fn local_error(&mut self, status: StatusCode, message: &str) {
        if !self.is_committed() {
            self.headers.remove(header::CONTENT_LENGTH);
            self.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
            self.headers.insert(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            );
        }
        self.write_header(status);
        self.write(message.as_bytes());
        self.write(b"\n");
    }

    /// The status the client receives. With nothing written the server sends 200.
    pub fn status(&self) -> StatusCode {
        match self.status {
            StatusState::Unset => StatusCode::OK,
            StatusState::Implicit(code) | StatusState::Explicit(code) => code,
        }
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Build the response for the client.
    pub fn into_response(self) -> Response {
        let status = self.status();
        let body: Bytes = self.body.freeze();

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response
    }
}
