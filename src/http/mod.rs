//! HTTP-mode forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! TLS connection (axum-server)
//!     → server.rs (router, per-request access log)
//!     → forward.rs (one backend attempt per request)
//!         → request.rs (drop Host/Origin, build backend URI)
//!         → [backend round-trip via hyper-util client]
//!         → response.rs (rewrite Location pointing at the backend)
//!     → observer.rs (capture status and byte count)
//!     → access_log.rs (one line per exchange)
//!     → Send to client
//! ```

pub mod access_log;
pub mod forward;
pub mod observer;
pub mod request;
pub mod response;
pub mod server;

pub use access_log::{AccessLogEntry, AccessLogLine, ACCESS_LOG_TARGET};
pub use forward::{ForwardError, RequestForwarder};
pub use observer::{ResponseObserver, StatusState};
pub use request::filter_forwarded_headers;
pub use response::{rewrite_location_headers, BackendOrigin};
pub use server::HttpServer;
