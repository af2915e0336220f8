//! Per-exchange access log.
//!
//! One line per HTTP exchange, emitted after the handler returns:
//!
//! ```text
//! 200 GET "/index.html" 5120b (734 μs)
//! ```
//!
//! Lines go to the `access_log` tracing target.

use std::fmt;
use std::time::Instant;

use axum::http::{Method, StatusCode, Uri};
use percent_encoding::percent_decode_str;

use crate::http::observer::ResponseObserver;

/// Tracing target for access log lines.
pub const ACCESS_LOG_TARGET: &str = "access_log";

/// An exchange in progress. Consumed by [`AccessLogEntry::finish`], so it can
/// only be finalized once.
#[derive(Debug)]
pub struct AccessLogEntry {
    method: Method,
    path: String,
    start: Instant,
}

impl AccessLogEntry {
    /// Start timing an exchange. The logged path is percent-decoded.
    pub fn start(method: &Method, uri: &Uri) -> Self {
        Self {
            method: method.clone(),
            path: percent_decode_str(uri.path()).decode_utf8_lossy().into_owned(),
            start: Instant::now(),
        }
    }

    /// Finalize with what the observer saw being written.
    pub fn finish(self, observer: &ResponseObserver) -> AccessLogLine {
        AccessLogLine {
            status: observer.status(),
            method: self.method,
            path: self.path,
            bytes: observer.bytes_written(),
            elapsed_micros: self.start.elapsed().as_micros(),
        }
    }
}

/// A finalized access log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessLogLine {
    pub status: StatusCode,
    pub method: Method,
    pub path: String,
    pub bytes: usize,
    pub elapsed_micros: u128,
}

impl AccessLogLine {
    /// Write the line to the log sink.
    pub fn emit(&self) {
        tracing::info!(target: ACCESS_LOG_TARGET, "{}", self);
    }
}

impl fmt::Display for AccessLogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} \"{}\" {}b ({} μs)",
            self.status.as_u16(),
            self.method,
            self.path,
            self.bytes,
            self.elapsed_micros
        )
    }
}
