pub mod config;
pub mod logging_system;

pub use config::{AppenderConfig, ConfigError, LogLevel};
pub use logging_system::setup_logging;

use crate::appender::{Appender, SendParams};
use clap::Parser;
use std::time::Duration;
use tracing::{error, info, warn};

/// Sends test records to a syslog collector.
#[derive(Parser, Debug)]
#[command(name = "syslog-appender", author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: AppenderConfig,

    /// Message body
    #[arg(long, short = 'm', default_value = "syslog-appender test message")]
    pub message: String,

    /// Severity name for every record (config default when unset)
    #[arg(long)]
    pub severity: Option<String>,

    /// Number of records to send
    #[arg(long, default_value = "1")]
    pub count: u32,

    /// Pause between records in milliseconds
    #[arg(long, default_value = "1000")]
    pub interval_ms: u64,
}

impl Cli {
    fn message_for(&self, index: u32) -> String {
        if self.count > 1 {
            format!("{} #{}", self.message, index + 1)
        } else {
            self.message.clone()
        }
    }
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Sends `count` records. Delivery failures are logged, not returned; only
/// configuration problems end the run with an error.
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let appender = Appender::new(cli.config.clone())?;
    let interval = Duration::from_millis(cli.interval_ms);

    for index in 0..cli.count {
        let mut params = SendParams::new(cli.message_for(index));
        params.severity.clone_from(&cli.severity);

        match appender.send_message(params).await {
            Ok(()) => info!("Record {} delivered", index + 1),
            Err(e) if e.is_buffered() => warn!("Record {} buffered: {}", index + 1, e),
            Err(e) => {
                error!("Record {} failed: {}", index + 1, e);
                return Err(e.into());
            }
        }

        if index + 1 < cli.count {
            tokio::time::sleep(interval).await;
        }
    }

    let snapshot = appender.metrics();
    info!(
        "Done: {} sent, {} buffered, {} drains, avg latency {:?}",
        snapshot.records_sent, snapshot.records_buffered, snapshot.buffer_drains, snapshot.average_latency
    );
    Ok(())
}

pub async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut cli = Cli::parse();
    cli.config = cli.config.finish()?;

    setup_logging(cli.config.log_level)?;
    info!("Starting syslog-appender v{}", get_version());

    run(cli).await
}
