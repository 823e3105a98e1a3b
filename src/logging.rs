use crate::config::LoggingConfig;
use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use syslog::{BasicLogger, Facility, Formatter3164};

const PROCESS_NAME: &str = "tilt-matrix-controller";

/// Install the global logger.
///
/// `env_logger` is the default and honours `RUST_LOG` over the configured level.
/// Headless deployments can send records to the local syslog daemon instead.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let level: LevelFilter = config
        .level
        .parse()
        .context(format!("Invalid log level: {}", config.level))?;

    if config.syslog {
        let formatter = Formatter3164 {
            facility: Facility::LOG_DAEMON,
            hostname: None,
            process: PROCESS_NAME.to_string(),
            pid: std::process::id(),
        };
        let logger = syslog::unix(formatter).map_err(|e| anyhow!("Failed to connect to syslog: {}", e))?;
        log::set_boxed_logger(Box::new(BasicLogger::new(logger)))
            .map(|()| log::set_max_level(level))
            .context("Failed to install syslog logger")?;
    } else {
        // Systemd/journald will capture stdout/stderr.
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.level.as_str()))
            .try_init()
            .context("Failed to install env_logger")?;
    }
    Ok(())
}
