//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → tls.rs (credential, TLS acceptor)
//!     → tunnel.rs (handshake, backend dial, bidirectional relay)
//!     → connection.rs (connection IDs, lifecycle states)
//!
//! Tunnel States:
//!     Handshaking → Dialing → Relaying → Closed
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - The backend is never dialed before the client handshake completes
//! - The first relay direction to finish tears down both connections

pub mod connection;
pub mod listener;
pub mod tls;
pub mod tunnel;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker, TunnelState};
pub use listener::{Accepted, Listener, ListenerError};
pub use tls::{TlsCredential, TlsError};
pub use tunnel::{RelayStats, Tunnel, TunnelOutcome, TunnelServer};
