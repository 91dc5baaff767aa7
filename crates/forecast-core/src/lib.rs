pub mod config;
pub mod error;

pub use config::{Config, GoogleConfig, MailConfig, ValidationResult, WeatherConfig};
pub use error::{AppError, ConfigError, NetworkError};

use anyhow::Result;

/// Initialize logging for the process.
///
/// Logs go to stderr so stdout only carries the result line. The filter comes
/// from `RUST_LOG` and defaults to `warn`.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!("Forecast mailer core initialized");
    Ok(())
}
