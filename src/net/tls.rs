//! TLS credential loading.
//!
//! The certificate chain and private key are parsed once at startup into a
//! rustls `ServerConfig`. Both listeners are built from that same parsed
//! credential: the HTTP listener through axum-server, the tunnel listener
//! through a tokio-rustls acceptor.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::{RustlsAcceptor, RustlsConfig};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use thiserror::Error;
use tokio_rustls::TlsAcceptor;

/// Errors raised while loading the certificate/key pair.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificates found in {0:?}")]
    NoCertificates(PathBuf),

    #[error("no private key found in {0:?}")]
    NoPrivateKey(PathBuf),

    #[error("invalid certificate/key pair: {0}")]
    Rustls(#[from] rustls::Error),
}

/// A parsed certificate chain and private key, ready to terminate TLS.
#[derive(Clone)]
pub struct TlsCredential {
    server_config: Arc<ServerConfig>,
}

impl std::fmt::Debug for TlsCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsCredential").finish_non_exhaustive()
    }
}

impl TlsCredential {
    /// Load a PEM certificate chain and PEM private key from disk.
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self, TlsError> {
        let certs = read_certificates(cert_path)?;
        let key = read_private_key(key_path)?;
        Self::from_parts(certs, key)
    }

    /// Build a credential from an already-parsed chain and key.
    pub fn from_parts(
        certs: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
    ) -> Result<Self, TlsError> {
        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let server_config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(certs, key)?;

        Ok(Self {
            server_config: Arc::new(server_config),
        })
    }

    /// Acceptor for raw TLS connections. No ALPN protocols are advertised,
    /// since the tunnel does not interpret the inner protocol.
    pub fn acceptor(&self) -> TlsAcceptor {
        TlsAcceptor::from(Arc::clone(&self.server_config))
    }

    /// axum-server configuration advertising HTTP/2 and HTTP/1.1 via ALPN.
    pub fn http_config(&self) -> RustlsConfig {
        let mut config = (*self.server_config).clone();
        config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
        RustlsConfig::from_config(Arc::new(config))
    }

    /// axum-server acceptor for HTTP mode. `None` waits for the handshake
    /// indefinitely, overriding axum-server's built-in 10 second limit.
    pub fn http_acceptor(&self, handshake_timeout: Option<Duration>) -> RustlsAcceptor {
        RustlsAcceptor::new(self.http_config()).handshake_timeout(handshake_deadline(handshake_timeout))
    }
}

/// The deadline handed to axum-server. Tokio treats `Duration::MAX` as never.
pub(crate) fn handshake_deadline(configured: Option<Duration>) -> Duration {
    configured.unwrap_or(Duration::MAX)
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn read_certificates(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs)
}

fn read_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey(path.to_path_buf()))
}
