use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Missing or malformed endpoint credentials. No network call was made.
    #[error("browser session configuration error: {0}")]
    Configuration(String),

    #[error("browser connection failed: {0}")]
    Connection(String),

    #[error("browser {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// The page was reached but its content could not be read.
    #[error("page extraction failed: {0}")]
    Extraction(String),
}

impl SessionError {
    pub(crate) fn timeout(operation: &str, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}
