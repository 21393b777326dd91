//! Delivery sessions.
//!
//! A session owns exactly one connection attempt per `deliver` call. There is
//! no retry loop here: a failed record is appended to the retry buffer and the
//! backlog is flushed by the next session that manages to connect.

pub mod datagram;
pub mod metrics;
pub mod stream;
pub mod tls;
pub mod transport;

pub use datagram::DatagramSession;
pub use metrics::{DeliveryMetrics, DeliverySnapshot};
pub use stream::{StreamConnector, StreamSession, TcpConnector, TcpSession};
pub use tls::{IdentityCheck, TlsMaterial, TlsPolicy, TlsSession, TlsSetupError, TlsStreamConnector};
pub use transport::{AddressFamily, Endpoint, Transport, TransportKind, UnsupportedProtocol};

use crate::domain::AppenderError;
use crate::encoder::EncodedRecord;
use crate::reliability::{ConnectionState, RetryBuffer};
use std::future::Future;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum TransmissionError {
    #[error("Address resolution failed for {endpoint}: {source}")]
    Resolve {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("No {family} address found for {endpoint}")]
    NoAddress {
        endpoint: String,
        family: AddressFamily,
    },
    #[error("Connection failed: {0}")]
    ConnectFailed(#[source] io::Error),
    #[error("TLS handshake failed: {0}")]
    HandshakeFailed(#[source] io::Error),
    #[error("Write failed: {0}")]
    WriteFailed(#[source] io::Error),
    #[error("Waiting for peer close failed: {0}")]
    AckFailed(#[source] io::Error),
    #[error("Datagram send failed: {0}")]
    SendFailed(#[source] io::Error),
    #[error("{phase} timed out after {timeout:?}")]
    Timeout {
        phase: &'static str,
        timeout: Duration,
    },
}

/// Shared engine state handed to every session call.
#[derive(Clone, Copy)]
pub struct DeliveryContext<'a> {
    pub buffer: &'a RetryBuffer,
    pub state: &'a ConnectionState,
    pub metrics: &'a DeliveryMetrics,
}

/// One transport family's send strategy.
pub trait DeliverySession: Send + Sync {
    /// Sends one record, draining the retry buffer first when connected.
    ///
    /// On a transport failure the record is appended to the retry buffer
    /// before the error is returned.
    fn deliver(
        &self,
        record: &EncodedRecord,
        ctx: DeliveryContext<'_>,
    ) -> impl Future<Output = Result<(), AppenderError>> + Send;

    /// Opens a fresh connection and ships `payload` as a single unit.
    fn transmit(&self, payload: &[u8]) -> impl Future<Output = Result<(), TransmissionError>> + Send;
}

/// Timeouts and TLS settings used to build a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    pub tls: TlsPolicy,
}

/// The concrete session selected for a transport.
pub enum Session {
    Tls(TlsSession),
    Tcp(TcpSession),
    Udp(DatagramSession),
}

impl Session {
    pub fn for_transport(
        transport: Transport,
        endpoint: Endpoint,
        options: &SessionOptions,
    ) -> Result<Self, TlsSetupError> {
        Ok(match transport.kind {
            TransportKind::Tls => {
                let tcp = TcpConnector::new(endpoint.clone(), options.connect_timeout);
                Session::Tls(StreamSession::new(
                    TlsStreamConnector::new(tcp, &endpoint.host, &options.tls)?,
                    options.write_timeout,
                ))
            }
            TransportKind::Tcp => Session::Tcp(StreamSession::new(
                TcpConnector::new(endpoint, options.connect_timeout),
                options.write_timeout,
            )),
            TransportKind::Udp => {
                Session::Udp(DatagramSession::new(endpoint, options.write_timeout))
            }
        })
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            Session::Tls(_) => TransportKind::Tls,
            Session::Tcp(_) => TransportKind::Tcp,
            Session::Udp(_) => TransportKind::Udp,
        }
    }
}

impl DeliverySession for Session {
    async fn deliver(
        &self,
        record: &EncodedRecord,
        ctx: DeliveryContext<'_>,
    ) -> Result<(), AppenderError> {
        match self {
            Session::Tls(session) => session.deliver(record, ctx).await,
            Session::Tcp(session) => session.deliver(record, ctx).await,
            Session::Udp(session) => session.deliver(record, ctx).await,
        }
    }

    async fn transmit(&self, payload: &[u8]) -> Result<(), TransmissionError> {
        match self {
            Session::Tls(session) => session.transmit(payload).await,
            Session::Tcp(session) => session.transmit(payload).await,
            Session::Udp(session) => session.transmit(payload).await,
        }
    }
}

/// Failure path shared by every session: mark the engine disconnected and
/// persist the record before reporting the transport error.
pub(crate) async fn buffer_failed_record(
    record: &EncodedRecord,
    ctx: DeliveryContext<'_>,
    cause: TransmissionError,
) -> AppenderError {
    ctx.state.mark_disconnected();
    ctx.metrics.record_failure();

    match ctx.buffer.append(record).await {
        Ok(()) => {
            ctx.metrics.record_buffered(record.len());
            warn!(
                "Delivery failed, record buffered to {}: {}",
                ctx.buffer.path().display(),
                cause
            );
            AppenderError::Transport(cause)
        }
        Err(disk_error) => {
            error!(
                "Delivery failed ({}) and the record could not be buffered: {}",
                cause, disk_error
            );
            AppenderError::Buffer(disk_error)
        }
    }
}
