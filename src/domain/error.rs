use crate::app::config::ConfigError;
use crate::reliability::DiskError;
use crate::sender::{TlsSetupError, TransmissionError, UnsupportedProtocol};
use thiserror::Error;

/// Top-level error type returned by the appender facade.
///
/// `Transport` is the only variant that implies the record was persisted to the
/// retry buffer; every other variant is raised before a record exists or when
/// the buffer itself could not be written.
#[derive(Error, Debug)]
pub enum AppenderError {
    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("TLS setup error: {0}")]
    Tls(#[from] TlsSetupError),

    #[error("Retry buffer error: {0}")]
    Buffer(#[from] DiskError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransmissionError),
}

impl From<UnsupportedProtocol> for AppenderError {
    fn from(err: UnsupportedProtocol) -> Self {
        AppenderError::UnsupportedProtocol(err.0)
    }
}

impl AppenderError {
    /// True when the failed record was written to the retry buffer.
    pub fn is_buffered(&self) -> bool {
        matches!(self, AppenderError::Transport(_))
    }
}
