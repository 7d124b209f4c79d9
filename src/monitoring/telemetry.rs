use std::time::Instant;

use anyhow::{Context, Result};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::{LogFormat, LoggingConfig};

/// Build the level filter. `RUST_LOG` wins over the configured level.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("Invalid log level: {}", config.level))
}

/// Install the global tracing subscriber.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(config)?);

    match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(false))
            .try_init()
            .context("Failed to install tracing subscriber")?,
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(false))
            .try_init()
            .context("Failed to install tracing subscriber")?,
    }

    Ok(())
}

/// Logs how long an operation took when dropped.
pub struct OperationTimer {
    start_time: Instant,
    operation_name: &'static str,
}

impl OperationTimer {
    pub fn new(operation_name: &'static str) -> Self {
        Self {
            start_time: Instant::now(),
            operation_name,
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        debug!(
            operation = self.operation_name,
            duration_ms = %self.elapsed_ms(),
            "Operation completed"
        );
    }
}
