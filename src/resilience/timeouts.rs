//! Optional deadlines.
//!
//! # Responsibilities
//! - Wrap handshakes, backend dials and round-trips with a deadline when one is configured
//! - Leave the operation unbounded when the configured value is zero
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from the wrapped operation's own errors

use std::future::Future;
use std::time::Duration;

pub use tokio::time::error::Elapsed;

/// Run `future` to completion, or fail with `Elapsed` once `deadline` passes.
/// `None` waits indefinitely.
pub async fn with_deadline<F>(deadline: Option<Duration>, future: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, future).await,
        None => Ok(future.await),
    }
}
