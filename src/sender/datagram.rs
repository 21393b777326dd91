//! Datagram session (RFC 5426).

use super::{
    AddressFamily, DeliveryContext, DeliverySession, Endpoint, TransmissionError,
    buffer_failed_record,
};
use crate::domain::AppenderError;
use crate::encoder::EncodedRecord;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

/// Sends each record as one datagram from a freshly bound socket.
#[derive(Debug, Clone)]
pub struct DatagramSession {
    endpoint: Endpoint,
    send_timeout: Duration,
}

impl DatagramSession {
    pub fn new(endpoint: Endpoint, send_timeout: Duration) -> Self {
        Self {
            endpoint,
            send_timeout,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn send_datagram(&self, payload: &[u8]) -> Result<(), TransmissionError> {
        // First admitted address wins; there is no handshake to fall back on.
        let target = self.endpoint.resolve().await?[0];
        let socket = bind_socket(target, self.endpoint.family).map_err(TransmissionError::SendFailed)?;

        let sent = timeout(self.send_timeout, socket.send_to(payload, target))
            .await
            .map_err(|_| TransmissionError::Timeout {
                phase: "datagram send",
                timeout: self.send_timeout,
            })?
            .map_err(TransmissionError::SendFailed)?;

        debug!("Sent {} byte datagram to {}", sent, target);
        Ok(())
    }
}

/// Binds an ephemeral socket matching the target's family.
fn bind_socket(target: SocketAddr, family: AddressFamily) -> std::io::Result<UdpSocket> {
    let (domain, local): (Domain, SocketAddr) = if target.is_ipv4() {
        (Domain::IPV4, (Ipv4Addr::UNSPECIFIED, 0).into())
    } else {
        (Domain::IPV6, (Ipv6Addr::UNSPECIFIED, 0).into())
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if family == AddressFamily::V6 {
        socket.set_only_v6(true)?;
    }
    socket.bind(&local.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

impl DeliverySession for DatagramSession {
    async fn deliver(
        &self,
        record: &EncodedRecord,
        ctx: DeliveryContext<'_>,
    ) -> Result<(), AppenderError> {
        let started = Instant::now();

        if ctx.buffer.drain(self, ctx.state).await.is_drained() {
            ctx.metrics.record_drain();
        }

        match self.send_datagram(record.as_bytes()).await {
            Ok(()) => {
                ctx.state.mark_connected();
                ctx.metrics.record_sent(record.len(), started.elapsed());
                Ok(())
            }
            Err(e) => Err(buffer_failed_record(record, ctx, e).await),
        }
    }

    async fn transmit(&self, payload: &[u8]) -> Result<(), TransmissionError> {
        self.send_datagram(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transmit_sends_one_datagram() {
        let collector = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = collector.local_addr().unwrap().port();

        let session = DatagramSession::new(
            Endpoint::new("127.0.0.1", port, AddressFamily::V4),
            Duration::from_secs(1),
        );
        session.transmit(b"<134>1 - - - - - - one\n").await.unwrap();

        let mut buf = [0u8; 256];
        let (n, _) = collector.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"<134>1 - - - - - - one\n");
    }

    #[tokio::test]
    async fn test_v6_session_rejects_v4_target() {
        let session = DatagramSession::new(
            Endpoint::new("127.0.0.1", 514, AddressFamily::V6),
            Duration::from_secs(1),
        );
        let err = session.transmit(b"x").await.unwrap_err();
        assert!(matches!(err, TransmissionError::NoAddress { .. }));
    }
}
