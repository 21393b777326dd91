//! Appender facade.
//!
//! `Appender` owns the defaults, the retry buffer and the connection flag.
//! Each call merges its parameters with the defaults once, encodes one record
//! and hands it to a freshly built session.

pub mod environment;
pub mod params;

pub use environment::{Clock, FixedClock, SystemClock, local_hostname, process_id};
pub use params::SendParams;

use crate::app::config::AppenderConfig;
use crate::domain::{AppenderError, LogEvent, Severity};
use crate::encoder::encode;
use crate::reliability::{ConnectionState, RetryBuffer};
use crate::sender::{
    DeliveryContext, DeliveryMetrics, DeliverySession, DeliverySnapshot, Endpoint, Session,
    SessionOptions, TlsMaterial, TlsPolicy, Transport,
};
use params::ResolvedSend;
use std::sync::Arc;
use tracing::debug;

pub struct Appender {
    config: AppenderConfig,
    tls_material: Arc<TlsMaterial>,
    hostname: String,
    proc_id: String,
    buffer: RetryBuffer,
    state: ConnectionState,
    metrics: DeliveryMetrics,
    clock: Arc<dyn Clock>,
}

impl Appender {
    /// Validates the configuration and loads TLS material. No connection is
    /// opened until the first send.
    ///
    /// `config` is used as loaded: `default_eol` is taken literally, so a
    /// hand-built config carries the real line terminator.
    pub fn new(config: AppenderConfig) -> Result<Self, AppenderError> {
        config.validate()?;

        let tls_material = TlsMaterial::load(
            config.ca_path.as_deref(),
            config.certificate_path.as_deref(),
            config.key_path.as_deref(),
        )?;
        let hostname = config.hostname.clone().unwrap_or_else(local_hostname);

        debug!(
            "Appender ready: {}:{} via {}, buffer {}",
            config.host,
            config.port,
            config.protocol,
            config.buffer_file.display()
        );

        Ok(Self {
            buffer: RetryBuffer::new(config.buffer_file.clone()),
            tls_material: Arc::new(tls_material),
            hostname,
            proc_id: process_id(),
            state: ConnectionState::new(),
            metrics: DeliveryMetrics::new(),
            clock: Arc::new(SystemClock),
            config,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn debug(&self, params: impl Into<SendParams>) -> Result<(), AppenderError> {
        self.send_with_severity(params.into(), Severity::Debug).await
    }

    pub async fn info(&self, params: impl Into<SendParams>) -> Result<(), AppenderError> {
        self.send_with_severity(params.into(), Severity::Informational)
            .await
    }

    pub async fn warn(&self, params: impl Into<SendParams>) -> Result<(), AppenderError> {
        self.send_with_severity(params.into(), Severity::Warning).await
    }

    pub async fn error(&self, params: impl Into<SendParams>) -> Result<(), AppenderError> {
        self.send_with_severity(params.into(), Severity::Error).await
    }

    pub async fn alert(&self, params: impl Into<SendParams>) -> Result<(), AppenderError> {
        self.send_with_severity(params.into(), Severity::Alert).await
    }

    async fn send_with_severity(
        &self,
        mut params: SendParams,
        severity: Severity,
    ) -> Result<(), AppenderError> {
        params.severity = Some(severity.name().to_string());
        self.send_message(params).await
    }

    /// Encodes and delivers one record.
    ///
    /// An unknown transport token fails before anything is encoded or
    /// buffered. Transport failures leave the record in the retry buffer and
    /// return [`AppenderError::Transport`].
    pub async fn send_message(&self, params: impl Into<SendParams>) -> Result<(), AppenderError> {
        let resolved = ResolvedSend::merge(params.into(), &self.config, &self.hostname, &self.proc_id);

        let transport: Transport = resolved.protocol.parse()?;

        let endpoint = Endpoint::new(resolved.host.clone(), resolved.port, transport.family);
        let options = SessionOptions {
            connect_timeout: self.config.connect_timeout(),
            write_timeout: self.config.write_timeout(),
            tls: TlsPolicy {
                material: resolved
                    .tls_material
                    .clone()
                    .unwrap_or_else(|| self.tls_material.clone()),
                reject_unauthorized: self.config.reject_unauthorized,
                identity_check: resolved.identity_check.clone(),
            },
        };

        let record = encode(&self.build_event(resolved));
        let session = Session::for_transport(transport, endpoint, &options)?;

        debug!(
            "Sending {} byte record via {} ({})",
            record.len(),
            transport,
            session.kind().session_type()
        );

        session
            .deliver(
                &record,
                DeliveryContext {
                    buffer: &self.buffer,
                    state: &self.state,
                    metrics: &self.metrics,
                },
            )
            .await
    }

    fn build_event(&self, resolved: ResolvedSend) -> LogEvent {
        LogEvent {
            message: resolved.message,
            facility: resolved.facility,
            severity: resolved.severity,
            app_name: resolved.app_name,
            proc_id: resolved.proc_id,
            msg_id: resolved.msg_id,
            structured_data: resolved.structured_data,
            timestamp: self.clock.now(),
            eol: resolved.eol,
            hostname: resolved.hostname,
        }
    }

    pub fn config(&self) -> &AppenderConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn retry_buffer(&self) -> &RetryBuffer {
        &self.buffer
    }

    pub fn metrics(&self) -> DeliverySnapshot {
        self.metrics.snapshot()
    }
}
