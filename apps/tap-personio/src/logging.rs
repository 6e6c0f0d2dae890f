//! Log setup. Everything goes to stderr; stdout carries the message stream.

use tracing_subscriber::EnvFilter;

use crate::error::{CliError, CliResult};

/// Builds the filter from `RUST_LOG`, falling back to `level`.
pub fn env_filter(level: &str) -> CliResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| CliError::Logging(format!("{level}: {e}")))
}

/// Installs the global subscriber.
pub fn init_logging(level: &str) -> CliResult<()> {
    let filter = env_filter(level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))
}
