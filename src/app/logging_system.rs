use super::config::LogLevel;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Third-party targets kept at warn regardless of the configured level.
const QUIET_TARGETS: &[&str] = &["rustls", "tokio_rustls"];

pub fn build_filter_string(level: LogLevel) -> String {
    let mut parts = Vec::with_capacity(QUIET_TARGETS.len() + 1);
    parts.push(level.as_str().to_string());
    parts.extend(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")));
    parts.join(",")
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
pub fn setup_logging(level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives)?,
        _ => EnvFilter::try_new(build_filter_string(level))?,
    };

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
            .compact(),
    );

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_string() {
        assert_eq!(
            build_filter_string(LogLevel::Debug),
            "debug,rustls=warn,tokio_rustls=warn"
        );
    }

    #[test]
    fn test_filter_string_is_accepted_by_env_filter() {
        for level in [LogLevel::Error, LogLevel::Trace] {
            assert!(EnvFilter::try_new(build_filter_string(level)).is_ok());
        }
    }
}
