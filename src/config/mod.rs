//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional) + command-line flags
//!     → loader.rs (parse, deserialize, apply overrides)
//!     → validation.rs (semantic checks)
//!     → TerminatorConfig (validated, immutable)
//!     → shared via Arc to the server and forwarder
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError, Overrides};
pub use schema::{
    BackendConfig, ForwardMode, ListenerConfig, ObservabilityConfig, TerminatorConfig, TimeoutConfig,
    TlsConfig, DEFAULT_HTTP_BACKEND, DEFAULT_TUNNEL_BACKEND,
};
pub use validation::ValidationError;
