//! TLS stream transport (RFC 5425).
//!
//! Certificate material is loaded once from PEM files; a rustls client config
//! is built per session so per-call identity checks and material overrides
//! apply without touching the defaults.

use super::stream::{StreamConnector, StreamSession, TcpConnector};
use super::{Endpoint, TransmissionError};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::{VerifierBuilderError, WebPkiServerVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{
    CertificateError, ClientConfig, DigitallySignedStruct, Error as RustlsError, RootCertStore,
    SignatureScheme,
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::warn;

#[derive(Error, Debug)]
pub enum TlsSetupError {
    #[error("Failed to read {kind} from {path}: {source}")]
    Read {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No certificates found in {0}")]
    EmptyCertificates(PathBuf),
    #[error("No private key found in {0}")]
    MissingKey(PathBuf),
    #[error("Client certificate and key must be configured together")]
    IncompleteClientIdentity,
    #[error("A CA bundle is required when reject_unauthorized is enabled")]
    MissingTrustAnchors,
    #[error("Invalid server name: {0}")]
    InvalidServerName(String),
    #[error("Certificate verifier error: {0}")]
    Verifier(#[from] VerifierBuilderError),
    #[error("TLS configuration error: {0}")]
    Rustls(#[from] RustlsError),
}

/// Peer identity check: receives the target host and the peer's end-entity
/// certificate, returns a rejection reason on mismatch.
pub type IdentityCheck = Arc<dyn Fn(&str, &CertificateDer<'_>) -> Result<(), String> + Send + Sync>;

/// CA bundle and optional client identity, already decoded from PEM.
#[derive(Default)]
pub struct TlsMaterial {
    pub ca: Vec<CertificateDer<'static>>,
    pub certificate_chain: Vec<CertificateDer<'static>>,
    pub key: Option<PrivateKeyDer<'static>>,
}

impl TlsMaterial {
    /// Loads whichever PEM files are configured; missing paths stay empty.
    pub fn load(
        ca_path: Option<&Path>,
        certificate_path: Option<&Path>,
        key_path: Option<&Path>,
    ) -> Result<Self, TlsSetupError> {
        let ca = match ca_path {
            Some(path) => load_certificates("CA bundle", path)?,
            None => Vec::new(),
        };
        let certificate_chain = match certificate_path {
            Some(path) => load_certificates("client certificate", path)?,
            None => Vec::new(),
        };
        let key = match key_path {
            Some(path) => Some(load_private_key(path)?),
            None => None,
        };

        if certificate_chain.is_empty() != key.is_none() {
            return Err(TlsSetupError::IncompleteClientIdentity);
        }

        Ok(Self {
            ca,
            certificate_chain,
            key,
        })
    }

    pub fn has_client_identity(&self) -> bool {
        !self.certificate_chain.is_empty() && self.key.is_some()
    }
}

impl Clone for TlsMaterial {
    fn clone(&self) -> Self {
        Self {
            ca: self.ca.clone(),
            certificate_chain: self.certificate_chain.clone(),
            key: self.key.as_ref().map(PrivateKeyDer::clone_key),
        }
    }
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("ca", &self.ca.len())
            .field("certificate_chain", &self.certificate_chain.len())
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn read_pem(kind: &'static str, path: &Path) -> Result<Vec<u8>, TlsSetupError> {
    std::fs::read(path).map_err(|source| TlsSetupError::Read {
        kind,
        path: path.to_path_buf(),
        source,
    })
}

fn load_certificates(
    kind: &'static str,
    path: &Path,
) -> Result<Vec<CertificateDer<'static>>, TlsSetupError> {
    let pem = read_pem(kind, path)?;
    let certificates = rustls_pemfile::certs(&mut pem.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsSetupError::Read {
            kind,
            path: path.to_path_buf(),
            source,
        })?;

    if certificates.is_empty() {
        return Err(TlsSetupError::EmptyCertificates(path.to_path_buf()));
    }
    Ok(certificates)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsSetupError> {
    let pem = read_pem("client key", path)?;
    rustls_pemfile::private_key(&mut pem.as_slice())
        .map_err(|source| TlsSetupError::Read {
            kind: "client key",
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| TlsSetupError::MissingKey(path.to_path_buf()))
}

/// How the peer certificate is verified for one session.
#[derive(Clone, Default)]
pub struct TlsPolicy {
    pub material: Arc<TlsMaterial>,
    /// When false, verification failures are logged and the handshake proceeds.
    pub reject_unauthorized: bool,
    /// Replaces the certificate-hostname check when set.
    pub identity_check: Option<IdentityCheck>,
}

impl TlsPolicy {
    pub fn client_config(&self, host: &str) -> Result<Arc<ClientConfig>, TlsSetupError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let verifier = PeerVerifier::new(host, self, provider.clone())?;

        let builder = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier));

        let config = match &self.material.key {
            Some(key) if self.material.has_client_identity() => builder
                .with_client_auth_cert(self.material.certificate_chain.clone(), key.clone_key())?,
            None if self.material.certificate_chain.is_empty() => builder.with_no_client_auth(),
            _ => return Err(TlsSetupError::IncompleteClientIdentity),
        };
        Ok(Arc::new(config))
    }
}

impl fmt::Debug for TlsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsPolicy")
            .field("material", &self.material)
            .field("reject_unauthorized", &self.reject_unauthorized)
            .field("identity_check", &self.identity_check.is_some())
            .finish()
    }
}

struct PeerVerifier {
    host: String,
    roots: Option<Arc<WebPkiServerVerifier>>,
    identity_check: Option<IdentityCheck>,
    reject_unauthorized: bool,
    provider: Arc<CryptoProvider>,
}

impl PeerVerifier {
    fn new(
        host: &str,
        policy: &TlsPolicy,
        provider: Arc<CryptoProvider>,
    ) -> Result<Self, TlsSetupError> {
        let roots = if policy.material.ca.is_empty() {
            if policy.reject_unauthorized {
                return Err(TlsSetupError::MissingTrustAnchors);
            }
            None
        } else {
            let mut store = RootCertStore::empty();
            for certificate in &policy.material.ca {
                store.add(certificate.clone())?;
            }
            Some(WebPkiServerVerifier::builder_with_provider(Arc::new(store), provider.clone()).build()?)
        };

        Ok(Self {
            host: host.to_string(),
            roots,
            identity_check: policy.identity_check.clone(),
            reject_unauthorized: policy.reject_unauthorized,
            provider,
        })
    }

    fn check(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<(), RustlsError> {
        let Some(roots) = &self.roots else {
            return Err(RustlsError::InvalidCertificate(CertificateError::UnknownIssuer));
        };

        match roots.verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now) {
            Ok(_) => {}
            // The identity hook owns the hostname decision.
            Err(e) if self.identity_check.is_some() && is_name_mismatch(&e) => {}
            Err(e) => return Err(e),
        }

        if let Some(check) = &self.identity_check {
            check(&self.host, end_entity).map_err(RustlsError::General)?;
        }
        Ok(())
    }
}

fn is_name_mismatch(error: &RustlsError) -> bool {
    matches!(
        error,
        RustlsError::InvalidCertificate(
            CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. }
        )
    )
}

impl fmt::Debug for PeerVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerVerifier")
            .field("host", &self.host)
            .field("roots", &self.roots.is_some())
            .field("identity_check", &self.identity_check.is_some())
            .field("reject_unauthorized", &self.reject_unauthorized)
            .finish()
    }
}

impl ServerCertVerifier for PeerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        match self.check(end_entity, intermediates, server_name, ocsp_response, now) {
            Ok(()) => Ok(ServerCertVerified::assertion()),
            Err(e) if !self.reject_unauthorized => {
                warn!(
                    "Accepting unverified certificate from {} (reject_unauthorized disabled): {}",
                    self.host, e
                );
                Ok(ServerCertVerified::assertion())
            }
            Err(e) => Err(e),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// TCP connect followed by a TLS handshake.
pub struct TlsStreamConnector {
    tcp: TcpConnector,
    connector: tokio_rustls::TlsConnector,
    server_name: ServerName<'static>,
}

pub type TlsSession = StreamSession<TlsStreamConnector>;

impl TlsStreamConnector {
    pub fn new(tcp: TcpConnector, host: &str, policy: &TlsPolicy) -> Result<Self, TlsSetupError> {
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| TlsSetupError::InvalidServerName(host.to_string()))?;
        let config = policy.client_config(host)?;

        Ok(Self {
            tcp,
            connector: tokio_rustls::TlsConnector::from(config),
            server_name,
        })
    }
}

impl StreamConnector for TlsStreamConnector {
    type Stream = tokio_rustls::client::TlsStream<TcpStream>;

    async fn connect(&self) -> Result<Self::Stream, TransmissionError> {
        let stream = self.tcp.connect().await?;
        let handshake_timeout = self.tcp.connect_timeout();

        timeout(
            handshake_timeout,
            self.connector.connect(self.server_name.clone(), stream),
        )
        .await
        .map_err(|_| TransmissionError::Timeout {
            phase: "TLS handshake",
            timeout: handshake_timeout,
        })?
        .map_err(TransmissionError::HandshakeFailed)
    }

    fn endpoint(&self) -> &Endpoint {
        self.tcp.endpoint()
    }
}
