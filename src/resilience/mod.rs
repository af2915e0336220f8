//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! TLS handshake / backend dial / backend round-trip:
//!     → timeouts.rs (apply the configured deadline, if any)
//! ```
//!
//! # Design Decisions
//! - Deadlines are opt-in: a zero in the configuration means "wait forever"
//! - Every forwarding attempt is a single attempt; callers retry if they want to

pub mod timeouts;

pub use timeouts::with_deadline;
