//! Connection-level tunneling.
//!
//! Each accepted connection walks `Handshaking → Dialing → Relaying → Closed`.
//! The backend is dialed only after the client's TLS handshake succeeds, and
//! a failed dial closes the client without relaying anything.
//!
//! While relaying, two spawned tasks copy bytes in opposite directions. They
//! share a single teardown token: whichever finishes first (end of stream,
//! I/O error, or panic) cancels it, and the other stops. Both connections are
//! closed once both tasks have exited.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinError;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;

use crate::config::{TerminatorConfig, TimeoutConfig};
use crate::net::connection::{ConnectionId, ConnectionTracker, TunnelState};
use crate::net::listener::{Accepted, Listener, ListenerError};
use crate::net::tls::TlsCredential;
use crate::resilience::with_deadline;

const RELAY_BUFFER_SIZE: usize = 16 * 1024;

/// Accept loop for tunnel mode.
pub struct TunnelServer {
    listener: Listener,
    tunnel: Tunnel,
    tracker: ConnectionTracker,
}

impl TunnelServer {
    pub fn new(listener: Listener, credential: &TlsCredential, config: &TerminatorConfig) -> Self {
        Self {
            listener,
            tunnel: Tunnel::new(credential.acceptor(), config.backend_address(), config.timeouts.clone()),
            tracker: ConnectionTracker::new(),
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Handle to the live connection count.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Accept connections until `shutdown` fires. Each connection runs in its own task.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ListenerError> {
        tracing::info!(
            address = %self.listener.local_addr(),
            backend = %self.tunnel.backend,
            "Tunnel server starting"
        );

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(Accepted { stream, peer, slot }) => {
                        let tunnel = self.tunnel.clone();
                        let guard = self.tracker.track();
                        tokio::spawn(async move {
                            tunnel.run(stream, peer, guard.id()).await;
                            drop(guard);
                            drop(slot);
                        });
                    }
                    Err(ListenerError::Closed) => return Err(ListenerError::Closed),
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!(
                        active_connections = self.tracker.active_count(),
                        "Tunnel server received shutdown signal, no longer accepting"
                    );
                    break;
                }
            }
        }

        tracing::info!("Tunnel server stopped");
        Ok(())
    }
}

/// How one tunnel connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelOutcome {
    /// The client never completed the TLS handshake. No backend dial happened.
    HandshakeFailed,
    /// The backend could not be reached. The client was closed.
    DialFailed,
    /// Bytes were relayed until one side finished.
    Closed(RelayStats),
}

/// Per-connection tunnel settings. Cheap to clone into each connection task.
#[derive(Clone)]
pub struct Tunnel {
    acceptor: TlsAcceptor,
    backend: Arc<str>,
    timeouts: TimeoutConfig,
}

impl Tunnel {
    pub fn new(acceptor: TlsAcceptor, backend: &str, timeouts: TimeoutConfig) -> Self {
        Self {
            acceptor,
            backend: Arc::from(backend),
            timeouts,
        }
    }

    /// Drive one accepted connection to `Closed`.
    pub async fn run(&self, stream: TcpStream, peer: SocketAddr, id: ConnectionId) -> TunnelOutcome {
        let started = Instant::now();
        let mut state = TunnelState::Handshaking;
        tracing::trace!(connection_id = %id, peer_addr = %peer, %state, "Tunnel state");

        let handshake = with_deadline(self.timeouts.handshake(), self.acceptor.accept(stream)).await;
        let client = match flatten(handshake) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(connection_id = %id, peer_addr = %peer, error = %e, "TLS handshake failed");
                return TunnelOutcome::HandshakeFailed;
            }
        };

        state = TunnelState::Dialing;
        tracing::trace!(connection_id = %id, %state, "Tunnel state");

        let dial = with_deadline(self.timeouts.connect(), TcpStream::connect(&*self.backend)).await;
        let backend = match flatten(dial) {
            Ok(backend) => backend,
            Err(e) => {
                tracing::warn!(
                    connection_id = %id,
                    peer_addr = %peer,
                    backend = %self.backend,
                    error = %e,
                    "Backend dial failed"
                );
                let mut client = client;
                let _ = client.shutdown().await;
                return TunnelOutcome::DialFailed;
            }
        };

        state = TunnelState::Relaying;
        tracing::debug!(connection_id = %id, peer_addr = %peer, backend = %self.backend, %state, "Tunnel established");

        let stats = splice(client, backend, id).await;

        state = TunnelState::Closed;
        tracing::info!(
            connection_id = %id,
            peer_addr = %peer,
            bytes_to_backend = stats.client_to_backend,
            bytes_to_client = stats.backend_to_client,
            faulted = stats.faulted,
            duration_ms = started.elapsed().as_millis() as u64,
            %state,
            "Tunnel closed"
        );
        TunnelOutcome::Closed(stats)
    }
}

fn flatten<T>(result: Result<io::Result<T>, crate::resilience::timeouts::Elapsed>) -> io::Result<T> {
    match result {
        Ok(inner) => inner,
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "deadline elapsed")),
    }
}

/// Byte counts for one relayed connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub client_to_backend: u64,
    pub backend_to_client: u64,
    /// A relay task panicked and was contained.
    pub faulted: bool,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    ClientToBackend,
    BackendToClient,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::ClientToBackend => f.write_str("client->backend"),
            Direction::BackendToClient => f.write_str("backend->client"),
        }
    }
}

/// Relay bytes between `client` and `backend` until either direction ends,
/// then close both.
pub async fn splice<C, B>(client: C, backend: B, id: ConnectionId) -> RelayStats
where
    C: AsyncRead + AsyncWrite + Send + 'static,
    B: AsyncRead + AsyncWrite + Send + 'static,
{
    let (client_read, client_write) = tokio::io::split(client);
    let (backend_read, backend_write) = tokio::io::split(backend);
    let teardown = CancellationToken::new();

    let upstream = tokio::spawn(relay(client_read, backend_write, teardown.clone()));
    let downstream = tokio::spawn(relay(backend_read, client_write, teardown.clone()));

    let (upstream, downstream) = tokio::join!(upstream, downstream);

    let mut stats = RelayStats::default();
    stats.client_to_backend = settle(upstream, Direction::ClientToBackend, id, &mut stats.faulted);
    stats.backend_to_client = settle(downstream, Direction::BackendToClient, id, &mut stats.faulted);
    stats
}

/// Copy one direction. Runs inside its own task so a panic stays local.
async fn relay<R, W>(mut reader: R, mut writer: W, teardown: CancellationToken) -> (u64, io::Result<()>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    // Cancels on every exit, unwinding included.
    let _teardown_on_exit = teardown.clone().drop_guard();

    let mut copied = 0u64;
    let result = tokio::select! {
        result = copy_counting(&mut reader, &mut writer, &mut copied) => result,
        () = teardown.cancelled() => Ok(()),
    };

    teardown.cancel();
    let _ = writer.shutdown().await;
    (copied, result)
}

async fn copy_counting<R, W>(reader: &mut R, writer: &mut W, copied: &mut u64) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        writer.write_all(&buf[..n]).await?;
        writer.flush().await?;
        *copied += n as u64;
    }
}

fn settle(
    joined: Result<(u64, io::Result<()>), JoinError>,
    direction: Direction,
    id: ConnectionId,
    faulted: &mut bool,
) -> u64 {
    match joined {
        Ok((copied, Ok(()))) => copied,
        Ok((copied, Err(e))) => {
            tracing::debug!(connection_id = %id, %direction, error = %e, "Relay ended with error");
            copied
        }
        Err(e) => {
            *faulted = true;
            if e.is_panic() {
                tracing::error!(connection_id = %id, %direction, "Relay task panicked, tearing down connection");
            } else {
                tracing::error!(connection_id = %id, %direction, error = %e, "Relay task aborted");
            }
            0
        }
    }
}
