//! TLS terminator library.
//!
//! Accepts TLS connections, decrypts them and forwards the plaintext to a
//! single backend, either per HTTP request or as a raw byte tunnel.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;

pub use config::TerminatorConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use net::TunnelServer;
