//! Stream sessions (plain TCP and TLS).
//!
//! Framing is one record per connection: the record is written, the write
//! side is half-closed, and the peer closing its side acknowledges delivery.

use super::{
    DeliveryContext, DeliverySession, Endpoint, TransmissionError, buffer_failed_record,
};
use crate::domain::AppenderError;
use crate::encoder::EncodedRecord;
use std::future::Future;
use std::io;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Opens one stream connection per call.
pub trait StreamConnector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    fn connect(&self) -> impl Future<Output = Result<Self::Stream, TransmissionError>> + Send;

    fn endpoint(&self) -> &Endpoint;
}

#[derive(Debug, Clone)]
pub struct TcpConnector {
    endpoint: Endpoint,
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(endpoint: Endpoint, connect_timeout: Duration) -> Self {
        Self {
            endpoint,
            connect_timeout,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl StreamConnector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self) -> Result<TcpStream, TransmissionError> {
        let mut last_error = None;

        // Try each resolved address in turn, like a dual-stack client would.
        for addr in self.endpoint.resolve().await? {
            match timeout(self.connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    debug!("Connected to {} ({})", self.endpoint, addr);
                    return Ok(stream);
                }
                Ok(Err(e)) => {
                    debug!("Connect to {} failed: {}", addr, e);
                    last_error = Some(TransmissionError::ConnectFailed(e));
                }
                Err(_) => {
                    debug!("Connect to {} timed out", addr);
                    last_error = Some(TransmissionError::Timeout {
                        phase: "connect",
                        timeout: self.connect_timeout,
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| TransmissionError::NoAddress {
            endpoint: self.endpoint.to_string(),
            family: self.endpoint.family,
        }))
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

pub struct StreamSession<C> {
    connector: C,
    write_timeout: Duration,
}

pub type TcpSession = StreamSession<TcpConnector>;

impl<C: StreamConnector> StreamSession<C> {
    pub fn new(connector: C, write_timeout: Duration) -> Self {
        Self {
            connector,
            write_timeout,
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }
}

impl<C: StreamConnector> DeliverySession for StreamSession<C> {
    async fn deliver(
        &self,
        record: &EncodedRecord,
        ctx: DeliveryContext<'_>,
    ) -> Result<(), AppenderError> {
        let started = Instant::now();

        let mut stream = match self.connector.connect().await {
            Ok(stream) => stream,
            Err(e) => return Err(buffer_failed_record(record, ctx, e).await),
        };
        ctx.state.mark_connected();

        // The backlog goes out on its own connection before this record is written.
        if ctx.buffer.drain(self, ctx.state).await.is_drained() {
            ctx.metrics.record_drain();
        }

        match write_and_close(&mut stream, record.as_bytes(), self.write_timeout).await {
            Ok(()) => {
                ctx.metrics.record_sent(record.len(), started.elapsed());
                debug!(
                    "Delivered {} bytes to {} in {:?}",
                    record.len(),
                    self.connector.endpoint(),
                    started.elapsed()
                );
                Ok(())
            }
            Err(e) => Err(buffer_failed_record(record, ctx, e).await),
        }
    }

    async fn transmit(&self, payload: &[u8]) -> Result<(), TransmissionError> {
        let mut stream = self.connector.connect().await?;
        write_and_close(&mut stream, payload, self.write_timeout).await
    }
}

/// Writes `payload`, half-closes, then waits for the peer to close.
pub(crate) async fn write_and_close<S>(
    stream: &mut S,
    payload: &[u8],
    write_timeout: Duration,
) -> Result<(), TransmissionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let exchange = async {
        stream
            .write_all(payload)
            .await
            .map_err(TransmissionError::WriteFailed)?;
        stream
            .shutdown()
            .await
            .map_err(TransmissionError::WriteFailed)?;
        await_remote_close(stream)
            .await
            .map_err(TransmissionError::AckFailed)
    };

    timeout(write_timeout, exchange)
        .await
        .map_err(|_| TransmissionError::Timeout {
            phase: "write",
            timeout: write_timeout,
        })?
}

async fn await_remote_close<S>(stream: &mut S) -> io::Result<()>
where
    S: AsyncRead + Unpin,
{
    let mut scratch = [0u8; 512];
    loop {
        match stream.read(&mut scratch).await {
            Ok(0) => return Ok(()),
            Ok(_) => {}
            // TLS peers that drop the socket without close_notify.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        }
    }
}
