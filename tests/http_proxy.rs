//! End-to-end tests for HTTP-mode forwarding over real TLS.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use tls_terminator::config::TerminatorConfig;
use tls_terminator::http::HttpServer;
use tls_terminator::lifecycle::Shutdown;
use tls_terminator::net::TlsCredential;

mod common;

use common::{http_response, start_mock_backend, unused_addr, TestCert};

async fn start_proxy(config: TerminatorConfig, shutdown: &Shutdown) -> SocketAddr {
    let credential = TlsCredential::load(Path::new(&config.tls.cert_path), Path::new(&config.tls.key_path)).unwrap();
    let server = HttpServer::new(&config).unwrap();
    let handle = server.handle();
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(&credential, rx).await;
    });

    handle.listening().await.expect("server failed to bind")
}

#[tokio::test]
async fn forwards_over_tls() {
    let cert = TestCert::generate();
    let (backend, accepts) =
        start_mock_backend(http_response("200 OK", &[("X-Backend", "yes")], "hello from backend")).await;

    let shutdown = Shutdown::new();
    let proxy = start_proxy(cert.config(&format!("http://{}", backend)), &shutdown).await;
    let client = cert.https_client(proxy);

    let res = client
        .get(format!("https://localhost:{}/greeting?lang=en", proxy.port()))
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-backend"], "yes");
    assert_eq!(res.text().await.unwrap(), "hello from backend");
    assert_eq!(accepts.get(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn foreign_redirect_is_untouched() {
    let cert = TestCert::generate();
    let location = "https://sso.example/login?next=/a";
    let (backend, _) = start_mock_backend(http_response("302 Found", &[("Location", location)], "")).await;

    let shutdown = Shutdown::new();
    let proxy = start_proxy(cert.config(&format!("http://{}", backend)), &shutdown).await;
    let client = cert.https_client(proxy);

    let res = client
        .get(format!("https://localhost:{}/a", proxy.port()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 302);
    assert_eq!(res.headers()["location"], location);

    shutdown.trigger();
}

#[tokio::test]
async fn self_redirect_round_trip() {
    let cert = TestCert::generate();

    // Bind first so the redirect can name the backend's own address.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = listener.local_addr().unwrap();
    let response = http_response("302 Found", &[("Location", &format!("http://{}/b", backend))], "");
    tokio::spawn(async move {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        while let Ok((mut socket, _)) = listener.accept().await {
            let response = response.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    let shutdown = Shutdown::new();
    let proxy = start_proxy(cert.config(&format!("http://{}", backend)), &shutdown).await;
    let client = cert.https_client(proxy);

    let res = client
        .get(format!("https://localhost:{}/a", proxy.port()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 302);
    assert_eq!(res.headers()["location"], "/b");

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_backend_is_bad_gateway() {
    let cert = TestCert::generate();
    let backend = unused_addr().await;

    let shutdown = Shutdown::new();
    let proxy = start_proxy(cert.config(&format!("http://{}", backend)), &shutdown).await;
    let client = cert.https_client(proxy);

    let res = client
        .post(format!("https://localhost:{}/submit", proxy.port()))
        .body("payload")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 502);
    assert_eq!(res.headers()["content-type"], "text/plain; charset=utf-8");
    assert_eq!(res.headers()["x-content-type-options"], "nosniff");
    assert!(!res.text().await.unwrap().is_empty());

    shutdown.trigger();
}

#[tokio::test]
async fn untrusted_client_fails_handshake() {
    let cert = TestCert::generate();
    let other = TestCert::generate();
    let (backend, accepts) = start_mock_backend(http_response("200 OK", &[], "ok")).await;

    let shutdown = Shutdown::new();
    let proxy = start_proxy(cert.config(&format!("http://{}", backend)), &shutdown).await;
    let client = other.https_client(proxy);

    let result = client
        .get(format!("https://localhost:{}/", proxy.port()))
        .send()
        .await;
    assert!(result.is_err());
    assert_eq!(accepts.get(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn idle_handshake_waits_without_deadline() {
    use tokio::io::AsyncReadExt;

    let cert = TestCert::generate();
    let (backend, _) = start_mock_backend(http_response("200 OK", &[], "ok")).await;

    let shutdown = Shutdown::new();
    let proxy = start_proxy(cert.config(&format!("http://{}", backend)), &shutdown).await;

    // No ClientHello is ever sent. With handshake_secs = 0 the server must not
    // give up, not even after axum-server's own 10 second default.
    let mut idle = tokio::net::TcpStream::connect(proxy).await.unwrap();
    let mut buf = [0u8; 1];
    let read = tokio::time::timeout(Duration::from_secs(11), idle.read(&mut buf)).await;
    assert!(read.is_err(), "connection closed early: {:?}", read);

    shutdown.trigger();
}

#[tokio::test]
async fn idle_handshake_honours_configured_deadline() {
    use tokio::io::AsyncReadExt;

    let cert = TestCert::generate();
    let (backend, _) = start_mock_backend(http_response("200 OK", &[], "ok")).await;

    let mut config = cert.config(&format!("http://{}", backend));
    config.timeouts.handshake_secs = 1;
    let shutdown = Shutdown::new();
    let proxy = start_proxy(config, &shutdown).await;

    let mut idle = tokio::net::TcpStream::connect(proxy).await.unwrap();
    let mut buf = [0u8; 1];
    let read = tokio::time::timeout(Duration::from_secs(5), idle.read(&mut buf))
        .await
        .expect("handshake deadline not applied");
    assert!(matches!(read, Ok(0) | Err(_)));

    shutdown.trigger();
}
