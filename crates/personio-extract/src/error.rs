//! Error types for the Personio extraction engine.

use thiserror::Error;

/// Result type alias using `TapError`.
pub type TapResult<T> = Result<T, TapError>;

/// Errors that can occur while extracting from Personio.
#[derive(Debug, Error)]
pub enum TapError {
    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The auth endpoint rejected the credentials or returned garbage.
    #[error("Could not authorize with Personio: {message}")]
    Auth { message: String },

    /// Transport or decode failure while fetching a page.
    #[error("Failed to fetch page for stream {stream} from {url}: {message}")]
    PageFetch {
        stream: String,
        url: String,
        message: String,
    },

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog content is unusable.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// One or more streams aborted mid-traversal.
    #[error("Sync finished with failed streams: {}", streams.join(", "))]
    StreamsFailed { streams: Vec<String> },
}

impl TapError {
    /// Returns true if the error must halt the whole run rather than one stream.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, TapError::Auth { .. } | TapError::Io(_))
    }
}
