use thiserror::Error;

/// Errors returned by the collector API client.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// No collector registered for the platform, or an unusable request.
    #[error("collector configuration error: {0}")]
    Configuration(String),

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success HTTP status.
    #[error("collector API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The remote job finished with a failure status.
    #[error("snapshot {snapshot_id} failed: {reason}")]
    Collection { snapshot_id: String, reason: String },

    /// The poll budget ran out before the snapshot finished.
    #[error("snapshot {snapshot_id} not ready after {attempts} polls at {interval_ms}ms")]
    Timeout {
        snapshot_id: String,
        attempts: u32,
        interval_ms: u64,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CollectorError {
    /// Authentication and authorization failures mean the key is wrong, not
    /// that the service is down.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }
}
