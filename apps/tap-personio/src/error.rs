//! CLI error type.

use personio_extract::TapError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that end a `tap-personio` invocation.
#[derive(Debug, Error)]
pub enum CliError {
    /// Failure inside the extraction engine.
    #[error(transparent)]
    Tap(#[from] TapError),

    /// Writing discovery output failed.
    #[error("Output error: {0}")]
    Output(String),

    /// The log filter could not be built.
    #[error("Invalid log level: {0}")]
    Logging(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Output(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(format!("JSON error: {e}"))
    }
}
