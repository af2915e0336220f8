//! TLS terminator
//!
//! Terminates TLS in front of a plaintext backend.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                   TLS TERMINATOR                     │
//!                  │                                                      │
//!   TLS client     │  ┌──────────┐   mode = "http"   ┌──────────────┐     │
//!   ───────────────┼─▶│ listener │──────────────────▶│  forwarder   │─────┼──▶ HTTP backend
//!                  │  │  + TLS   │                   │ + access log │     │
//!                  │  └────┬─────┘                   └──────────────┘     │
//!                  │       │        mode = "tunnel"  ┌──────────────┐     │
//!                  │       └────────────────────────▶│    tunnel    │─────┼──▶ TCP backend
//!                  │                                 │ (byte splice)│     │
//!                  │                                 └──────────────┘     │
//!                  └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use tls_terminator::config::{self, ForwardMode, Overrides};
use tls_terminator::lifecycle::{self, Shutdown};
use tls_terminator::observability;

#[derive(Parser, Debug)]
#[command(name = "tls-terminator")]
#[command(about = "Terminate TLS and forward plaintext to a backend", long_about = None)]
struct Cli {
    /// Optional TOML configuration file. Flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address [default: 0.0.0.0:443]
    #[arg(long)]
    listen: Option<String>,

    /// Backend URL (http mode) or host:port (tunnel mode)
    /// [default: http://127.0.0.1 in http mode, 127.0.0.1:80 in tunnel mode]
    #[arg(long)]
    backend: Option<String>,

    /// TLS certificate chain path (PEM) [default: cert.pem]
    #[arg(long)]
    cert: Option<String>,

    /// TLS private key path (PEM) [default: key.pem]
    #[arg(long)]
    key: Option<String>,

    /// Forwarding mode: http or tunnel [default: http]
    #[arg(long)]
    mode: Option<ForwardMode>,

    /// Log level (trace, debug, info, warn, error) [default: info]
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            mode: self.mode,
            listen: self.listen.clone(),
            backend: self.backend.clone(),
            cert: self.cert.clone(),
            key: self.key.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config::resolve_config(cli.config.as_deref(), cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tls-terminator: {}", e);
            return ExitCode::FAILURE;
        }
    };

    observability::init_logging(&config.observability.log_level);
    tracing::info!(mode = %config.mode, "tls-terminator v{} starting", env!("CARGO_PKG_VERSION"));

    let shutdown = Shutdown::new();
    let result = {
        let server = lifecycle::run(config, &shutdown);
        tokio::pin!(server);
        tokio::select! {
            result = &mut server => result,
            _ = lifecycle::wait_for_signal() => {
                shutdown.trigger();
                server.await
            }
        }
    };

    match result {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}
