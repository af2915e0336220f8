//! Tunnel connection identity and lifecycle.
//!
//! Every accepted tunnel gets a `conn-N` id that appears on all of its log
//! lines, and moves through [`TunnelState`]:
//!
//! ```text
//! Handshaking ──▶ Dialing ──▶ Relaying ──▶ Closed
//!      │             │                       ▲
//!      └─────────────┴───────(failure)───────┘
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    /// TLS handshake with the client in progress.
    Handshaking,
    /// Handshake done, connecting to the backend.
    Dialing,
    /// Bytes flowing in both directions.
    Relaying,
    /// Both connections are closed.
    Closed,
}

impl fmt::Display for TunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TunnelState::Handshaking => "handshaking",
            TunnelState::Dialing => "dialing",
            TunnelState::Relaying => "relaying",
            TunnelState::Closed => "closed",
        })
    }
}

/// Hands out connection ids and counts live tunnels.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    issued: AtomicU64,
    live: AtomicU64,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection. It counts as live until the guard drops.
    pub fn track(&self) -> ConnectionGuard {
        let id = ConnectionId(self.inner.issued.fetch_add(1, Ordering::Relaxed) + 1);
        self.inner.live.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            id,
            counters: Arc::clone(&self.inner),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.inner.live.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct ConnectionGuard {
    id: ConnectionId,
    counters: Arc<Counters>,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
    }
}
