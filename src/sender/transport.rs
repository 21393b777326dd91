//! Transport selection: maps a protocol token to a session kind and address
//! family, and resolves endpoints under that family.

use super::TransmissionError;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;
use tokio::net::lookup_host;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported protocol: {0:?}")]
pub struct UnsupportedProtocol(pub String);

/// The transport family a session speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// RFC 5425: syslog over TLS.
    Tls,
    /// RFC 6587: syslog over plain TCP.
    Tcp,
    /// RFC 5426: syslog over UDP.
    Udp,
}

impl TransportKind {
    pub fn session_type(self) -> &'static str {
        match self {
            TransportKind::Tls => "encrypted",
            TransportKind::Tcp => "plain-stream",
            TransportKind::Udp => "datagram",
        }
    }
}

/// Address-family preference; `Any` accepts whatever resolution yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressFamily {
    #[default]
    Any,
    V4,
    V6,
}

impl AddressFamily {
    /// Family number as used in connection options (0, 4 or 6).
    pub fn number(self) -> u8 {
        match self {
            AddressFamily::Any => 0,
            AddressFamily::V4 => 4,
            AddressFamily::V6 => 6,
        }
    }

    pub fn admits(self, addr: &SocketAddr) -> bool {
        match self {
            AddressFamily::Any => true,
            AddressFamily::V4 => addr.is_ipv4(),
            AddressFamily::V6 => addr.is_ipv6(),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::Any => f.write_str("any"),
            AddressFamily::V4 => f.write_str("IPv4"),
            AddressFamily::V6 => f.write_str("IPv6"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transport {
    pub kind: TransportKind,
    pub family: AddressFamily,
}

const TRANSPORTS: [(&str, Transport); 9] = [
    ("tls", Transport::new(TransportKind::Tls, AddressFamily::Any)),
    ("tls4", Transport::new(TransportKind::Tls, AddressFamily::V4)),
    ("tls6", Transport::new(TransportKind::Tls, AddressFamily::V6)),
    ("tcp", Transport::new(TransportKind::Tcp, AddressFamily::Any)),
    ("tcp4", Transport::new(TransportKind::Tcp, AddressFamily::V4)),
    ("tcp6", Transport::new(TransportKind::Tcp, AddressFamily::V6)),
    ("udp", Transport::new(TransportKind::Udp, AddressFamily::Any)),
    ("udp4", Transport::new(TransportKind::Udp, AddressFamily::V4)),
    ("udp6", Transport::new(TransportKind::Udp, AddressFamily::V6)),
];

impl Transport {
    pub const fn new(kind: TransportKind, family: AddressFamily) -> Self {
        Self { kind, family }
    }

    pub fn token(self) -> &'static str {
        TRANSPORTS
            .iter()
            .find(|(_, transport)| *transport == self)
            .map_or("unknown", |(token, _)| token)
    }

    /// Every token accepted by [`Transport::from_str`].
    pub fn tokens() -> impl Iterator<Item = &'static str> {
        TRANSPORTS.iter().map(|(token, _)| *token)
    }
}

impl FromStr for Transport {
    type Err = UnsupportedProtocol;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim();
        TRANSPORTS
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(token))
            .map(|(_, transport)| *transport)
            .ok_or_else(|| UnsupportedProtocol(token.to_string()))
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Collector address as seen by one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub family: AddressFamily,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, family: AddressFamily) -> Self {
        Self {
            host: host.into(),
            port,
            family,
        }
    }

    /// Resolves the host, keeping only addresses of the requested family.
    pub async fn resolve(&self) -> Result<Vec<SocketAddr>, TransmissionError> {
        let addrs: Vec<SocketAddr> = lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|source| TransmissionError::Resolve {
                endpoint: self.to_string(),
                source,
            })?
            .filter(|addr| self.family.admits(addr))
            .collect();

        if addrs.is_empty() {
            return Err(TransmissionError::NoAddress {
                endpoint: self.to_string(),
                family: self.family,
            });
        }
        Ok(addrs)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
