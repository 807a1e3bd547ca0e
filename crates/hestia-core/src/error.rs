use thiserror::Error;

/// Application-wide error types for Hestia.
///
/// These cover the I/O plumbing around the pipeline. They never escape a
/// fetch: [`crate::fetch::ResilientFetcher`] converts them into a blocked
/// outcome with the `internal_error` reason.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a page or calling the record sink).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Headless browser failed to launch, navigate or answer a CDP call.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// Record-sync API rejected a call.
    #[error("Sink error (HTTP {status_code}): {message}")]
    SinkError { message: String, status_code: u16 },

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Operation timed out.
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Invalid or missing configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if the sink call is worth repeating once.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) => true,
            AppError::SinkError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            AppError::HttpError(msg) => {
                msg.contains("timeout") || msg.contains("connect") || msg.contains("reset")
            }
            _ => false,
        }
    }
}
