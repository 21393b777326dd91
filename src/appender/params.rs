use crate::app::config::AppenderConfig;
use crate::domain::{Facility, Severity, StructuredData};
use crate::sender::{IdentityCheck, TlsMaterial};
use std::fmt;
use std::sync::Arc;

/// Per-call parameters. Anything left `None` falls back to the appender's
/// configured default.
#[derive(Clone, Default)]
pub struct SendParams {
    pub message: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<String>,
    pub app_name: Option<String>,
    pub eol: Option<String>,
    pub facility: Option<String>,
    pub severity: Option<String>,
    pub hostname: Option<String>,
    pub proc_id: Option<String>,
    pub msg_id: Option<String>,
    pub structured_data: Option<StructuredData>,
    pub tls_material: Option<Arc<TlsMaterial>>,
    pub identity_check: Option<IdentityCheck>,
}

impl SendParams {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn eol(mut self, eol: impl Into<String>) -> Self {
        self.eol = Some(eol.into());
        self
    }

    pub fn facility(mut self, facility: impl Into<String>) -> Self {
        self.facility = Some(facility.into());
        self
    }

    pub fn severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn proc_id(mut self, proc_id: impl Into<String>) -> Self {
        self.proc_id = Some(proc_id.into());
        self
    }

    pub fn msg_id(mut self, msg_id: impl Into<String>) -> Self {
        self.msg_id = Some(msg_id.into());
        self
    }

    pub fn structured_data(mut self, structured_data: StructuredData) -> Self {
        self.structured_data = Some(structured_data);
        self
    }

    pub fn tls_material(mut self, material: Arc<TlsMaterial>) -> Self {
        self.tls_material = Some(material);
        self
    }

    pub fn identity_check(mut self, check: IdentityCheck) -> Self {
        self.identity_check = Some(check);
        self
    }
}

impl From<&str> for SendParams {
    fn from(message: &str) -> Self {
        SendParams::new(message)
    }
}

impl From<String> for SendParams {
    fn from(message: String) -> Self {
        SendParams::new(message)
    }
}

impl fmt::Debug for SendParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendParams")
            .field("message", &self.message)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("app_name", &self.app_name)
            .field("facility", &self.facility)
            .field("severity", &self.severity)
            .field("msg_id", &self.msg_id)
            .field("tls_material", &self.tls_material.is_some())
            .field("identity_check", &self.identity_check.is_some())
            .finish_non_exhaustive()
    }
}

/// Per-call parameters merged with the appender defaults.
pub(crate) struct ResolvedSend {
    pub message: String,
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub app_name: String,
    pub eol: String,
    pub facility: Facility,
    pub severity: Severity,
    pub hostname: String,
    pub proc_id: String,
    pub msg_id: String,
    pub structured_data: StructuredData,
    pub tls_material: Option<Arc<TlsMaterial>>,
    pub identity_check: Option<IdentityCheck>,
}

impl ResolvedSend {
    pub fn merge(
        params: SendParams,
        config: &AppenderConfig,
        hostname: &str,
        proc_id: &str,
    ) -> Self {
        let facility = params.facility.as_deref().unwrap_or(&config.default_facility);
        let severity = params.severity.as_deref().unwrap_or(&config.default_severity);

        Self {
            facility: Facility::resolve(facility),
            severity: Severity::resolve(severity),
            message: params.message,
            host: params.host.unwrap_or_else(|| config.host.clone()),
            port: params.port.unwrap_or(config.port),
            protocol: params.protocol.unwrap_or_else(|| config.protocol.clone()),
            app_name: params.app_name.unwrap_or_else(|| config.default_app_name.clone()),
            eol: params.eol.unwrap_or_else(|| config.default_eol.clone()),
            hostname: params.hostname.unwrap_or_else(|| hostname.to_string()),
            proc_id: params.proc_id.unwrap_or_else(|| proc_id.to_string()),
            msg_id: params.msg_id.unwrap_or_else(|| config.default_msg_id.clone()),
            structured_data: params
                .structured_data
                .unwrap_or_else(|| config.default_structured_data.clone()),
            tls_material: params.tls_material,
            identity_check: params.identity_check,
        }
    }
}
