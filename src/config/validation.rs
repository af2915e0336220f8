//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the backend address shape against the forwarding mode
//! - Validate value ranges (connection limit > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TerminatorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{ForwardMode, TerminatorConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("listener.max_connections must be greater than zero")]
    MaxConnections,

    #[error("backend.address '{address}' is not an http:// URL: {reason}")]
    BackendUrl { address: String, reason: String },

    #[error("backend.address '{0}' is not a host:port pair")]
    BackendHostPort(String),

    #[error("tls.{0} must not be empty")]
    EmptyPath(&'static str),

    #[error("observability.log_level '{0}' is not one of trace, debug, info, warn, error")]
    LogLevel(String),
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &TerminatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::MaxConnections);
    }

    match config.mode {
        ForwardMode::Http => {
            if let Err(reason) = check_backend_url(config.backend_address()) {
                errors.push(ValidationError::BackendUrl {
                    address: config.backend_address().to_string(),
                    reason,
                });
            }
        }
        ForwardMode::Tunnel => {
            if !is_host_port(config.backend_address()) {
                errors.push(ValidationError::BackendHostPort(config.backend_address().to_string()));
            }
        }
    }

    if config.tls.cert_path.trim().is_empty() {
        errors.push(ValidationError::EmptyPath("cert_path"));
    }
    if config.tls.key_path.trim().is_empty() {
        errors.push(ValidationError::EmptyPath("key_path"));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_backend_url(address: &str) -> Result<(), String> {
    let url = Url::parse(address).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("query and fragment are not allowed".to_string());
    }
    Ok(())
}

fn is_host_port(address: &str) -> bool {
    match address.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}
