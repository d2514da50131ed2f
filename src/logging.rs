use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins over the configured level.
pub fn build_filter(configured_level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directives = format!("{},rusqlite=warn", configured_level);
    EnvFilter::try_new(&directives)
        .map_err(|e| anyhow!("Invalid log filter '{}': {}", directives, e))
}

/// Logs go to stderr so command output on stdout stays clean.
pub fn init(configured_level: &str) -> Result<()> {
    let filter = build_filter(configured_level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
