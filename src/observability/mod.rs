//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → structured tracing events (lifecycle, errors)
//!     → access_log target (one line per HTTP exchange)
//!
//! Consumer:
//!     → logging.rs subscriber, line-oriented on stderr
//! ```

pub mod logging;

pub use logging::init_logging;
