//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Route crate events and access log lines to stderr
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - Access log lines use their own target, always enabled at `info` so that
//!   raising the level never drops them

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::http::ACCESS_LOG_TARGET;

/// Filter directives used when `RUST_LOG` is not set. `level` applies to the
/// crate's own events; the access log stays at `info`.
pub fn default_directives(level: &str) -> String {
    format!(
        "tls_terminator={level},{target}=info,tower_http=warn",
        level = level,
        target = ACCESS_LOG_TARGET
    )
}

/// Install the global subscriber. Call once, at startup.
pub fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Lines(Arc<Mutex<Vec<u8>>>);

    impl Write for Lines {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Emit one access line and one crate warning under `level`, return the output.
    fn emitted_at(level: &str) -> String {
        let lines = Lines::default();
        let writer = lines.clone();
        let subscriber = tracing_subscriber::registry()
            .with(EnvFilter::new(default_directives(level)))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(move || writer.clone()),
            );

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: ACCESS_LOG_TARGET, "200 GET \"/x\" 0b (1 μs)");
            tracing::info!(target: "tls_terminator::net", "Listener bound");
            tracing::warn!(target: "tls_terminator::net", "Accept failed");
        });

        let bytes = lines.0.lock().unwrap().clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn directives_parse() {
        let directives = default_directives("debug");
        assert_eq!(directives, "tls_terminator=debug,access_log=info,tower_http=warn");
        assert!(EnvFilter::try_new(directives).is_ok());
    }

    #[test]
    fn access_log_survives_quiet_levels() {
        for level in ["warn", "error"] {
            let output = emitted_at(level);
            assert_eq!(output.matches("access_log:").count(), 1, "{}: {}", level, output);
            assert!(!output.contains("Listener bound"), "{}: {}", level, output);
        }
    }

    #[test]
    fn crate_events_follow_configured_level() {
        let output = emitted_at("info");
        assert!(output.contains("Listener bound"), "{}", output);
        assert!(output.contains("Accept failed"), "{}", output);
        assert_eq!(output.matches("access_log:").count(), 1, "{}", output);
    }
}
