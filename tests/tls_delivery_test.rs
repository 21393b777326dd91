use parking_lot::Mutex;
use rustls::RootCertStore;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use syslog_appender::domain::AppenderError;
use syslog_appender::sender::TransmissionError;
use syslog_appender::{Appender, AppenderConfig, IdentityCheck, SendParams, TlsMaterial};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_rustls::TlsAcceptor;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn certificates(name: &str) -> Vec<CertificateDer<'static>> {
    let pem = std::fs::read(fixture(name)).unwrap();
    rustls_pemfile::certs(&mut pem.as_slice())
        .collect::<Result<_, _>>()
        .unwrap()
}

fn private_key(name: &str) -> PrivateKeyDer<'static> {
    let pem = std::fs::read(fixture(name)).unwrap();
    rustls_pemfile::private_key(&mut pem.as_slice())
        .unwrap()
        .unwrap()
}

fn acceptor(require_client_cert: bool) -> TlsAcceptor {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = rustls::ServerConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .unwrap();

    let builder = if require_client_cert {
        let mut roots = RootCertStore::empty();
        for certificate in certificates("ca.crt") {
            roots.add(certificate).unwrap();
        }
        let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider)
            .build()
            .unwrap();
        builder.with_client_cert_verifier(verifier)
    } else {
        builder.with_no_client_auth()
    };

    let config = builder
        .with_single_cert(certificates("server.crt"), private_key("server.key"))
        .unwrap();
    TlsAcceptor::from(Arc::new(config))
}

/// TLS collector: one record per connection, closes after the client does.
async fn spawn_tls_collector(require_client_cert: bool) -> (u16, mpsc::UnboundedReceiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let acceptor = acceptor(require_client_cert);
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let Ok(mut tls) = acceptor.accept(stream).await else {
                    return;
                };
                let mut received = Vec::new();
                if tls.read_to_end(&mut received).await.is_ok() {
                    let _ = tx.send(received);
                }
                let _ = tls.shutdown().await;
            });
        }
    });

    (port, rx)
}

fn config(temp_dir: &TempDir, port: u16) -> AppenderConfig {
    AppenderConfig {
        host: "localhost".to_string(),
        port,
        protocol: "tls4".to_string(),
        hostname: Some("tls-client".to_string()),
        buffer_file: temp_dir.path().join("buffer"),
        connect_timeout_ms: 2_000,
        write_timeout_ms: 2_000,
        ..AppenderConfig::default()
    }
}

async fn next(rx: &mut mpsc::UnboundedReceiver<Vec<u8>>) -> String {
    let bytes = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    String::from_utf8(bytes).unwrap()
}

#[tokio::test]
async fn test_stalled_handshake_times_out_and_buffers() {
    let temp_dir = TempDir::new().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    // Accepts TCP but never answers the ClientHello.
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let appender = Appender::new(AppenderConfig {
        connect_timeout_ms: 200,
        ..config(&temp_dir, port)
    })
    .unwrap();

    let err = appender.send_message("no handshake").await.unwrap_err();

    assert!(
        matches!(
            err,
            AppenderError::Transport(TransmissionError::Timeout { phase: "TLS handshake", .. })
        ),
        "unexpected error: {err}"
    );
    assert!(err.is_buffered());
    let buffered = std::fs::read_to_string(temp_dir.path().join("buffer")).unwrap();
    assert_eq!(buffered.lines().count(), 1);
    assert!(buffered.ends_with(" no handshake\n"));
}

#[tokio::test]
async fn test_verified_delivery_with_ca() {
    let temp_dir = TempDir::new().unwrap();
    let (port, mut received) = spawn_tls_collector(false).await;
    let appender = Appender::new(AppenderConfig {
        ca_path: Some(fixture("ca.crt")),
        reject_unauthorized: true,
        ..config(&temp_dir, port)
    })
    .unwrap();

    appender.warn("over tls").await.unwrap();

    let record = next(&mut received).await;
    assert!(record.starts_with("<132>1 "));
    assert!(record.contains(" tls-client syslog-tls-appender "));
    assert!(record.ends_with(" over tls\n"));
    assert!(appender.is_connected());
}

#[tokio::test]
async fn test_identity_hook_receives_host_and_can_reject() {
    let temp_dir = TempDir::new().unwrap();
    let (port, _received) = spawn_tls_collector(false).await;
    let appender = Appender::new(AppenderConfig {
        ca_path: Some(fixture("ca.crt")),
        reject_unauthorized: true,
        ..config(&temp_dir, port)
    })
    .unwrap();

    let seen_host = Arc::new(Mutex::new(None));
    let recorder = seen_host.clone();
    let check: IdentityCheck = Arc::new(
        move |host: &str, _certificate: &CertificateDer<'_>| -> Result<(), String> {
            *recorder.lock() = Some(host.to_string());
            Err(format!("{host} is not the pinned collector"))
        },
    );

    let err = appender
        .send_message(SendParams::new("pinned").identity_check(check))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppenderError::Transport(TransmissionError::HandshakeFailed(_))
    ));
    assert_eq!(seen_host.lock().as_deref(), Some("localhost"));

    let buffered = std::fs::read_to_string(temp_dir.path().join("buffer")).unwrap();
    assert!(buffered.ends_with(" pinned\n"));
}

#[tokio::test]
async fn test_unverified_peer_is_accepted_when_not_rejecting() {
    let temp_dir = TempDir::new().unwrap();
    let (port, mut received) = spawn_tls_collector(false).await;
    let appender = Appender::new(config(&temp_dir, port)).unwrap();

    appender.info("no ca configured").await.unwrap();

    assert!(next(&mut received).await.ends_with(" no ca configured\n"));
}

#[tokio::test]
async fn test_mutual_tls_with_per_call_material() {
    let temp_dir = TempDir::new().unwrap();
    let (port, mut received) = spawn_tls_collector(true).await;
    let appender = Appender::new(AppenderConfig {
        reject_unauthorized: true,
        ca_path: Some(fixture("ca.crt")),
        ..config(&temp_dir, port)
    })
    .unwrap();

    let material = TlsMaterial::load(
        Some(fixture("ca.crt").as_path()),
        Some(fixture("client.crt").as_path()),
        Some(fixture("client.key").as_path()),
    )
    .unwrap();
    assert!(material.has_client_identity());

    appender
        .send_message(SendParams::new("mutual").tls_material(Arc::new(material)))
        .await
        .unwrap();

    assert!(next(&mut received).await.ends_with(" mutual\n"));
}

#[tokio::test]
async fn test_mutual_tls_from_config_files() {
    let temp_dir = TempDir::new().unwrap();
    let (port, mut received) = spawn_tls_collector(true).await;
    let appender = Appender::new(AppenderConfig {
        ca_path: Some(fixture("ca.crt")),
        certificate_path: Some(fixture("client.crt")),
        key_path: Some(fixture("client.key")),
        reject_unauthorized: true,
        ..config(&temp_dir, port)
    })
    .unwrap();

    appender.error("configured identity").await.unwrap();

    let record = next(&mut received).await;
    assert!(record.starts_with("<131>1 "));
}
