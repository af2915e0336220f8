//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the terminator.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the TLS terminator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TerminatorConfig {
    /// How terminated traffic is relayed to the backend.
    pub mode: ForwardMode,

    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Plaintext backend that receives the decrypted traffic.
    pub backend: BackendConfig,

    /// Certificate and private key locations.
    pub tls: TlsConfig,

    /// Optional deadlines. Zero disables a deadline.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl TerminatorConfig {
    /// The configured backend, or the default for the forwarding mode.
    pub fn backend_address(&self) -> &str {
        match (&self.backend.address, self.mode) {
            (Some(address), _) => address.as_str(),
            (None, ForwardMode::Http) => DEFAULT_HTTP_BACKEND,
            (None, ForwardMode::Tunnel) => DEFAULT_TUNNEL_BACKEND,
        }
    }
}

/// Forwarding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ForwardMode {
    /// Terminate TLS in an HTTP server and re-issue each request to the backend.
    #[default]
    Http,
    /// Terminate TLS on a raw listener and splice bytes to a backend TCP connection.
    Tunnel,
}

impl fmt::Display for ForwardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardMode::Http => f.write_str("http"),
            ForwardMode::Tunnel => f.write_str("tunnel"),
        }
    }
}

impl FromStr for ForwardMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(ForwardMode::Http),
            "tunnel" => Ok(ForwardMode::Tunnel),
            other => Err(format!("unknown forwarding mode '{}' (expected 'http' or 'tunnel')", other)),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:443").
    pub bind_address: String,

    /// Maximum concurrent tunnel connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:443".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Backend used in HTTP mode when none is configured.
pub const DEFAULT_HTTP_BACKEND: &str = "http://127.0.0.1";

/// Backend used in tunnel mode when none is configured.
pub const DEFAULT_TUNNEL_BACKEND: &str = "127.0.0.1:80";

/// Backend configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend address. A base URL in HTTP mode ("http://127.0.0.1:8080"),
    /// a `host:port` pair in tunnel mode. Unset means the mode's default.
    pub address: Option<String>,
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to certificate chain file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: "cert.pem".to_string(),
            key_path: "key.pem".to_string(),
        }
    }
}

/// Timeout configuration for blocking operations.
///
/// Every value defaults to `0`, which means the operation waits indefinitely.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// TLS handshake deadline in seconds, both modes.
    pub handshake_secs: u64,

    /// Backend connection establishment deadline in seconds.
    pub connect_secs: u64,

    /// Backend request round-trip deadline in seconds (HTTP mode).
    pub request_secs: u64,
}

impl TimeoutConfig {
    pub fn handshake(&self) -> Option<Duration> {
        non_zero_secs(self.handshake_secs)
    }

    pub fn connect(&self) -> Option<Duration> {
        non_zero_secs(self.connect_secs)
    }

    pub fn request(&self) -> Option<Duration> {
        non_zero_secs(self.request_secs)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
