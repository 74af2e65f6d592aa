//! HTTP client for the job-based collector API.
//!
//! `POST {base}/trigger?collector=<id>` starts a job and returns a snapshot
//! id; `GET {base}/snapshot/<id>` reports its status and, once finished, the
//! collected records.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Response, Url};
use serde_json::Value;
use trendscout_core::Platform;

use crate::error::CollectorError;
use crate::retry::retry_with_backoff;
use crate::types::{CollectorJob, JobStatus, PollBudget, SnapshotState, TriggerResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.brightdata.com/dca";

const RETRY_BACKOFF_BASE_MS: u64 = 1_000;
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Client for the collector API.
///
/// Use [`CollectorClient::new`] for production or
/// [`CollectorClient::with_base_url`] to point at a mock server in tests.
pub struct CollectorClient {
    client: Client,
    api_key: String,
    base_url: Url,
    collectors: HashMap<Platform, String>,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl std::fmt::Debug for CollectorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorClient")
            .field("base_url", &self.base_url.as_str())
            .field("collectors", &self.collectors)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl CollectorClient {
    /// Creates a client pointed at the production collector API.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_key: &str,
        timeout_secs: u64,
        collectors: HashMap<Platform, String>,
    ) -> Result<Self, CollectorError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL, collectors)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::Configuration`] for an empty key or a base URL
    /// that is not http(s), and [`CollectorError::Http`] if the client cannot
    /// be built.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
        collectors: HashMap<Platform, String>,
    ) -> Result<Self, CollectorError> {
        if api_key.trim().is_empty() {
            return Err(CollectorError::Configuration(
                "collector API key is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("trendscout/0.1 (trend-collection)")
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| {
            CollectorError::Configuration(format!("invalid base URL '{base_url}': {e}"))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(CollectorError::Configuration(format!(
                "collector base URL must be http(s): {base_url}"
            )));
        }

        Ok(Self {
            client,
            api_key: api_key.trim().to_owned(),
            base_url,
            collectors,
            max_retries: 1,
            retry_backoff_ms: RETRY_BACKOFF_BASE_MS,
        })
    }

    /// Sets how many times a trigger is retried on connection-class failures.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_ms = backoff_base_ms;
        self
    }

    #[must_use]
    pub fn collector_id(&self, platform: &Platform) -> Option<&str> {
        self.collectors.get(platform).map(String::as_str)
    }

    /// Starts a collection job for `platform`.
    ///
    /// `params` must be a JSON object; it becomes the request body, with
    /// `format` and `include_metadata` filled in when absent.
    ///
    /// # Errors
    ///
    /// - [`CollectorError::Configuration`] if no collector is registered for
    ///   the platform or `params` is not an object.
    /// - [`CollectorError::Http`] / [`CollectorError::Api`] when the request
    ///   fails after retries.
    /// - [`CollectorError::Deserialize`] if the response has no snapshot id.
    pub async fn trigger(
        &self,
        platform: &Platform,
        params: &Value,
    ) -> Result<CollectorJob, CollectorError> {
        let collector_id = self.collector_id(platform).ok_or_else(|| {
            CollectorError::Configuration(format!("no collector registered for platform {platform}"))
        })?;

        let Value::Object(mut body) = params.clone() else {
            return Err(CollectorError::Configuration(format!(
                "trigger params for {platform} must be a JSON object"
            )));
        };
        body.entry("format").or_insert_with(|| Value::from("json"));
        body.entry("include_metadata").or_insert(Value::Bool(true));
        let body = Value::Object(body);

        let mut url = self.endpoint(&["trigger"])?;
        url.query_pairs_mut().append_pair("collector", collector_id);

        let response: TriggerResponse = retry_with_backoff(self.max_retries, self.retry_backoff_ms, || {
            let url = url.clone();
            let body = &body;
            async move {
                let response = self
                    .client
                    .post(url.clone())
                    .bearer_auth(&self.api_key)
                    .json(body)
                    .send()
                    .await?;
                let text = Self::check_status(response).await?;
                serde_json::from_str(&text).map_err(|e| CollectorError::Deserialize {
                    context: format!("trigger(collector={collector_id})"),
                    source: e,
                })
            }
        })
        .await?;

        tracing::info!(
            platform = %platform,
            collector = collector_id,
            snapshot_id = %response.snapshot_id,
            "collector job triggered"
        );

        Ok(CollectorJob {
            snapshot_id: response.snapshot_id,
            platform: platform.clone(),
            status: JobStatus::Queued,
            created_at: Utc::now(),
        })
    }

    /// Polls `job` until it finishes or `budget` is spent.
    ///
    /// The first request goes out immediately; later ones wait
    /// `budget.interval`. The whole call is additionally capped at
    /// `budget.total()`. On any error the job is left `Failed`.
    ///
    /// # Errors
    ///
    /// - [`CollectorError::Collection`] when the job reports failure.
    /// - [`CollectorError::Timeout`] when the budget runs out.
    /// - [`CollectorError::Api`] when the key is rejected.
    pub async fn poll(
        &self,
        job: &mut CollectorJob,
        budget: PollBudget,
    ) -> Result<Vec<Value>, CollectorError> {
        let outcome = tokio::time::timeout(budget.total(), self.poll_loop(job, budget)).await;

        let result = outcome.unwrap_or_else(|_| {
            Err(CollectorError::Timeout {
                snapshot_id: job.snapshot_id.clone(),
                attempts: budget.max_attempts,
                interval_ms: budget.interval_ms(),
            })
        });

        match &result {
            Ok(items) => {
                job.status = JobStatus::Succeeded;
                tracing::info!(
                    platform = %job.platform,
                    snapshot_id = %job.snapshot_id,
                    items = items.len(),
                    "collector job succeeded"
                );
            }
            Err(e) => {
                job.status = JobStatus::Failed;
                tracing::warn!(
                    platform = %job.platform,
                    snapshot_id = %job.snapshot_id,
                    error = %e,
                    "collector job failed"
                );
            }
        }
        result
    }

    /// Triggers a job and polls it to completion.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::trigger`] or [`Self::poll`].
    pub async fn collect(
        &self,
        platform: &Platform,
        params: &Value,
        budget: PollBudget,
    ) -> Result<Vec<Value>, CollectorError> {
        let mut job = self.trigger(platform, params).await?;
        self.poll(&mut job, budget).await
    }

    async fn poll_loop(
        &self,
        job: &mut CollectorJob,
        budget: PollBudget,
    ) -> Result<Vec<Value>, CollectorError> {
        let url = self.endpoint(&["snapshot", &job.snapshot_id])?;

        for attempt in 1..=budget.max_attempts {
            match self.fetch_snapshot(&url).await {
                Ok(SnapshotState::Ready(items)) => return Ok(items),
                Ok(SnapshotState::Failed(reason)) => {
                    return Err(CollectorError::Collection {
                        snapshot_id: job.snapshot_id.clone(),
                        reason,
                    });
                }
                Ok(SnapshotState::Pending(status)) => {
                    job.status = status;
                    tracing::debug!(
                        snapshot_id = %job.snapshot_id,
                        attempt,
                        max_attempts = budget.max_attempts,
                        status = %status,
                        "snapshot not ready"
                    );
                }
                Ok(SnapshotState::Unrecognized(status)) => {
                    tracing::debug!(
                        snapshot_id = %job.snapshot_id,
                        attempt,
                        status = %status,
                        "unrecognized snapshot status, still waiting"
                    );
                }
                Err(e) if e.is_auth_failure() => return Err(e),
                Err(e) => {
                    tracing::debug!(
                        snapshot_id = %job.snapshot_id,
                        attempt,
                        error = %e,
                        "snapshot poll failed, counting as an attempt"
                    );
                }
            }

            if attempt < budget.max_attempts {
                tokio::time::sleep(budget.interval).await;
            }
        }

        Err(CollectorError::Timeout {
            snapshot_id: job.snapshot_id.clone(),
            attempts: budget.max_attempts,
            interval_ms: budget.interval_ms(),
        })
    }

    async fn fetch_snapshot(&self, url: &Url) -> Result<SnapshotState, CollectorError> {
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let text = Self::check_status(response).await?;
        if text.trim().is_empty() {
            return Ok(SnapshotState::Pending(JobStatus::Running));
        }
        let body: Value = serde_json::from_str(&text).map_err(|e| CollectorError::Deserialize {
            context: url.to_string(),
            source: e,
        })?;
        Ok(SnapshotState::from_body(body))
    }

    /// Builds `{base}/seg/seg` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, CollectorError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                CollectorError::Configuration(format!("base URL cannot have paths: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Returns the body on 2xx, or [`CollectorError::Api`] with a trimmed
    /// excerpt of the body otherwise.
    async fn check_status(response: Response) -> Result<String, CollectorError> {
        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            return Ok(text);
        }
        Err(CollectorError::Api {
            status: status.as_u16(),
            message: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> CollectorClient {
        let mut collectors = HashMap::new();
        collectors.insert(
            Platform::new(Platform::INSTAGRAM).unwrap(),
            "gd_l1vikfch901nx3by4".to_string(),
        );
        CollectorClient::with_base_url("test-key", 30, base_url, collectors)
            .expect("client construction should not fail")
    }

    #[test]
    fn endpoint_appends_segments() {
        let client = test_client("https://api.brightdata.com/dca");
        let url = client.endpoint(&["snapshot", "s_abc"]).unwrap();
        assert_eq!(url.as_str(), "https://api.brightdata.com/dca/snapshot/s_abc");
    }

    #[test]
    fn endpoint_handles_trailing_slash() {
        let client = test_client("https://api.brightdata.com/dca/");
        let url = client.endpoint(&["trigger"]).unwrap();
        assert_eq!(url.as_str(), "https://api.brightdata.com/dca/trigger");
    }

    #[test]
    fn endpoint_encodes_snapshot_id() {
        let client = test_client("https://api.brightdata.com/dca");
        let url = client.endpoint(&["snapshot", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "https://api.brightdata.com/dca/snapshot/a%2Fb%20c");
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let result = CollectorClient::with_base_url(" ", 30, DEFAULT_BASE_URL, HashMap::new());
        assert!(matches!(result, Err(CollectorError::Configuration(_))));
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let result = CollectorClient::with_base_url("k", 30, "ftp://example.com", HashMap::new());
        assert!(matches!(result, Err(CollectorError::Configuration(_))));
    }

    #[test]
    fn debug_output_hides_api_key() {
        let client = test_client("https://api.brightdata.com/dca");
        assert!(!format!("{client:?}").contains("test-key"));
    }
}
