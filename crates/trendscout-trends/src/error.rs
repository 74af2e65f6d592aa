use serde::Serialize;
use thiserror::Error;
use trendscout_browser::SessionError;
use trendscout_collector::CollectorError;

/// Why a platform's live collection did not produce data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Configuration,
    Connection,
    Collection,
    Timeout,
    Extraction,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Connection => "connection",
            Self::Collection => "collection",
            Self::Timeout => "timeout",
            Self::Extraction => "extraction",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum CollectError {
    /// Missing or invalid credentials, or no collector for the platform.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport or navigation failure.
    #[error("connection error: {0}")]
    Connection(String),

    /// The remote job reported failure.
    #[error("collection error: {0}")]
    Collection(String),

    #[error("timed out: {0}")]
    Timeout(String),

    /// The page was reached but its structure was not what we expected.
    #[error("extraction error: {0}")]
    Extraction(String),
}

impl CollectError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Connection(_) => ErrorCategory::Connection,
            Self::Collection(_) => ErrorCategory::Collection,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Extraction(_) => ErrorCategory::Extraction,
        }
    }
}

impl From<SessionError> for CollectError {
    fn from(err: SessionError) -> Self {
        let message = err.to_string();
        match err {
            SessionError::Configuration(_) => Self::Configuration(message),
            SessionError::Connection(_) => Self::Connection(message),
            SessionError::Timeout { .. } => Self::Timeout(message),
            SessionError::Extraction(_) => Self::Extraction(message),
        }
    }
}

impl From<CollectorError> for CollectError {
    fn from(err: CollectorError) -> Self {
        let message = err.to_string();
        match err {
            CollectorError::Configuration(_) => Self::Configuration(message),
            ref e if e.is_auth_failure() => Self::Configuration(message),
            CollectorError::Http(ref e) if e.is_timeout() => Self::Timeout(message),
            CollectorError::Http(_) | CollectorError::Api { .. } => Self::Connection(message),
            CollectorError::Collection { .. } | CollectorError::Deserialize { .. } => {
                Self::Collection(message)
            }
            CollectorError::Timeout { .. } => Self::Timeout(message),
        }
    }
}
