use super::{AppenderConfig, ConfigError};

impl AppenderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Host must not be empty".to_string(),
            ));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "Port must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout_ms == 0 || self.write_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Connect and write timeouts must be greater than 0".to_string(),
            ));
        }

        if self.buffer_file.as_os_str().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Buffer file path must not be empty".to_string(),
            ));
        }

        if self.certificate_path.is_some() != self.key_path.is_some() {
            return Err(ConfigError::InvalidConfig(
                "Client certificate and key must be configured together".to_string(),
            ));
        }

        for path in [&self.ca_path, &self.certificate_path, &self.key_path]
            .into_iter()
            .flatten()
        {
            if !path.is_file() {
                return Err(ConfigError::InvalidConfig(format!(
                    "TLS file does not exist: {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }
}
