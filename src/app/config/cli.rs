use super::serde_helpers::{
    load_env_path, load_env_path_opt, load_env_string, load_env_string_opt, load_env_var,
    unescape_eol,
};
use super::{ConfigError, LogLevel};
use crate::domain::StructuredData;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Appender defaults and connection settings.
///
/// Every `default_*` value can be overridden per call through `SendParams`.
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct AppenderConfig {
    /// CA bundle (PEM) used to verify the collector
    #[arg(long, env = "SYSLOG_CA_PATH")]
    pub ca_path: Option<PathBuf>,

    /// Client certificate chain (PEM) for mutual TLS
    #[arg(long = "cert-path", env = "SYSLOG_CERT_PATH")]
    pub certificate_path: Option<PathBuf>,

    /// Client private key (PEM) for mutual TLS
    #[arg(long, env = "SYSLOG_KEY_PATH")]
    pub key_path: Option<PathBuf>,

    /// Collector host
    #[arg(long, env = "SYSLOG_HOST", default_value = "localhost")]
    pub host: String,

    /// Collector port
    #[arg(long, env = "SYSLOG_PORT", default_value = "514")]
    pub port: u16,

    /// HOSTNAME field of emitted records (OS hostname when unset)
    #[arg(long, env = "SYSLOG_HOSTNAME")]
    pub hostname: Option<String>,

    /// Abort TLS handshakes whose peer certificate fails verification
    #[arg(long, env = "SYSLOG_REJECT_UNAUTHORIZED")]
    pub reject_unauthorized: bool,

    /// Transport token: tls, tcp or udp, optionally suffixed with 4 or 6
    #[arg(long, env = "SYSLOG_PROTOCOL", default_value = "tls")]
    pub protocol: String,

    #[arg(long, env = "SYSLOG_APP_NAME", default_value = "syslog-tls-appender")]
    pub default_app_name: String,

    /// Record terminator; `\n` style escapes are expanded
    #[arg(long, env = "SYSLOG_EOL", default_value = "\\n")]
    pub default_eol: String,

    #[arg(long, env = "SYSLOG_FACILITY", default_value = "LOCAL0")]
    pub default_facility: String,

    #[arg(long, env = "SYSLOG_SEVERITY", default_value = "DEBUG")]
    pub default_severity: String,

    /// Raw SD string or a JSON object of SD-ID -> params
    #[arg(long, env = "SYSLOG_STRUCTURED_DATA", default_value = "-")]
    pub default_structured_data: StructuredData,

    #[arg(long, env = "SYSLOG_MSG_ID", default_value = "-")]
    pub default_msg_id: String,

    /// Retry buffer file
    #[arg(long, env = "SYSLOG_BUFFER_FILE", default_value = "./buffer")]
    pub buffer_file: PathBuf,

    #[arg(long, env = "SYSLOG_CONNECT_TIMEOUT_MS", default_value = "10000")]
    pub connect_timeout_ms: u64,

    /// Covers write, half-close and waiting for the collector to close
    #[arg(long, env = "SYSLOG_WRITE_TIMEOUT_MS", default_value = "10000")]
    pub write_timeout_ms: u64,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// TOML configuration file; replaces flag and env values when given
    #[arg(long, env = "SYSLOG_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,
}

impl Default for AppenderConfig {
    fn default() -> Self {
        Self {
            ca_path: None,
            certificate_path: None,
            key_path: None,
            host: "localhost".to_string(),
            port: 514,
            hostname: None,
            reject_unauthorized: false,
            protocol: "tls".to_string(),
            default_app_name: "syslog-tls-appender".to_string(),
            default_eol: "\n".to_string(),
            default_facility: "LOCAL0".to_string(),
            default_severity: "DEBUG".to_string(),
            default_structured_data: StructuredData::nil(),
            default_msg_id: "-".to_string(),
            buffer_file: PathBuf::from("./buffer"),
            connect_timeout_ms: 10_000,
            write_timeout_ms: 10_000,
            log_level: LogLevel::Info,
            config_file: None,
        }
    }
}

impl AppenderConfig {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = AppenderConfig::parse_from(args);
        config.finish()
    }

    /// Applies `config_file` when set, then derives and validates.
    pub fn finish(mut self) -> Result<Self, ConfigError> {
        if let Some(path) = self.config_file.clone() {
            return Self::from_file(path);
        }
        self.post_process()?;
        self.validate()?;
        Ok(self)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = AppenderConfig::default();

        load_env_path_opt("SYSLOG_CA_PATH", &mut config.ca_path);
        load_env_path_opt("SYSLOG_CERT_PATH", &mut config.certificate_path);
        load_env_path_opt("SYSLOG_KEY_PATH", &mut config.key_path);
        load_env_string("SYSLOG_HOST", &mut config.host);
        load_env_var("SYSLOG_PORT", &mut config.port)?;
        load_env_string_opt("SYSLOG_HOSTNAME", &mut config.hostname);
        load_env_var("SYSLOG_REJECT_UNAUTHORIZED", &mut config.reject_unauthorized)?;
        load_env_string("SYSLOG_PROTOCOL", &mut config.protocol);
        load_env_string("SYSLOG_APP_NAME", &mut config.default_app_name);
        load_env_string("SYSLOG_EOL", &mut config.default_eol);
        load_env_string("SYSLOG_FACILITY", &mut config.default_facility);
        load_env_string("SYSLOG_SEVERITY", &mut config.default_severity);
        load_env_var("SYSLOG_STRUCTURED_DATA", &mut config.default_structured_data)?;
        load_env_string("SYSLOG_MSG_ID", &mut config.default_msg_id);
        load_env_path("SYSLOG_BUFFER_FILE", &mut config.buffer_file);
        load_env_var("SYSLOG_CONNECT_TIMEOUT_MS", &mut config.connect_timeout_ms)?;
        load_env_var("SYSLOG_WRITE_TIMEOUT_MS", &mut config.write_timeout_ms)?;

        // LogLevel requires case-insensitive parsing
        if let Ok(log_level) = std::env::var("LOG_LEVEL") {
            config.log_level = LogLevel::from_str(&log_level, true)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {log_level}")))?;
        }

        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: AppenderConfig = toml::from_str(&content)?;
        config.config_file = Some(path.as_ref().to_path_buf());
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    /// Expands escape sequences in `default_eol`. Run once by each loader;
    /// running it again on a loaded config is not supported.
    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.default_eol = unescape_eol(&self.default_eol);
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}
