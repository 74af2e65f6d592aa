//! The two ways a platform gets collected: a scripted browser session, or a
//! remote collector job that is triggered and then polled.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use trendscout_browser::{SessionConnector, SessionGuard};
use trendscout_collector::{CollectorClient, PollBudget};
use trendscout_core::Platform;

use crate::error::CollectError;
use crate::strategies::{self, BrowserSettings, ExtractionStrategy};
use crate::types::{CollectParams, RawItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionMethod {
    Browser,
    Job,
}

impl std::fmt::Display for CollectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Browser => write!(f, "browser"),
            Self::Job => write!(f, "job"),
        }
    }
}

/// Produces raw records for exactly one platform.
#[async_trait]
pub trait TrendCollector: Send + Sync {
    fn platform(&self) -> &Platform;

    fn method(&self) -> CollectionMethod;

    /// At most `params.bounded_limit()` records.
    ///
    /// The caller abandons the call at `deadline`. A sub-request that cannot
    /// finish before then is not started, and the records read so far are
    /// returned instead.
    async fn collect(
        &self,
        params: &CollectParams,
        deadline: Instant,
    ) -> Result<Vec<RawItem>, CollectError>;
}

/// Runs an [`ExtractionStrategy`] inside its own browser session.
pub struct BrowserCollector {
    platform: Platform,
    strategy: Box<dyn ExtractionStrategy>,
    connector: Arc<dyn SessionConnector>,
    settings: BrowserSettings,
}

impl BrowserCollector {
    #[must_use]
    pub fn new(
        platform: Platform,
        strategy: Box<dyn ExtractionStrategy>,
        connector: Arc<dyn SessionConnector>,
        settings: BrowserSettings,
    ) -> Self {
        Self {
            platform,
            strategy,
            connector,
            settings,
        }
    }
}

#[async_trait]
impl TrendCollector for BrowserCollector {
    fn platform(&self) -> &Platform {
        &self.platform
    }

    fn method(&self) -> CollectionMethod {
        CollectionMethod::Browser
    }

    async fn collect(
        &self,
        params: &CollectParams,
        deadline: Instant,
    ) -> Result<Vec<RawItem>, CollectError> {
        let mut session = SessionGuard::acquire(self.connector.as_ref(), self.platform.as_str()).await?;
        let result = strategies::collect(
            self.strategy.as_ref(),
            &mut session,
            params,
            &self.settings,
            deadline,
        )
        .await;
        session.release().await;
        result
    }
}

/// Triggers one collector job per keyword and merges the snapshots.
pub struct JobCollector {
    platform: Platform,
    client: Arc<CollectorClient>,
    budget: PollBudget,
    inter_request_delay: Duration,
}

impl JobCollector {
    #[must_use]
    pub fn new(
        platform: Platform,
        client: Arc<CollectorClient>,
        budget: PollBudget,
        inter_request_delay: Duration,
    ) -> Self {
        Self {
            platform,
            client,
            budget,
            inter_request_delay,
        }
    }

    /// Request body for one job: the roster params plus keyword and limit.
    fn job_body(params: &CollectParams, keyword: Option<&str>, limit: usize) -> Value {
        let mut body = match &params.extra {
            Some(Value::Object(extra)) => extra.clone(),
            _ => serde_json::Map::new(),
        };
        if let Some(keyword) = keyword {
            body.insert("keyword".into(), Value::from(keyword));
        }
        body.insert("limit".into(), Value::from(limit));
        body.insert("max_results".into(), Value::from(limit));
        Value::Object(body)
    }
}

#[async_trait]
impl TrendCollector for JobCollector {
    fn platform(&self) -> &Platform {
        &self.platform
    }

    fn method(&self) -> CollectionMethod {
        CollectionMethod::Job
    }

    async fn collect(
        &self,
        params: &CollectParams,
        deadline: Instant,
    ) -> Result<Vec<RawItem>, CollectError> {
        let limit = params.bounded_limit();
        let keywords: Vec<Option<&str>> = if params.keywords.is_empty() {
            vec![None]
        } else {
            params.keywords.iter().map(|k| Some(k.as_str())).collect()
        };

        let mut items: Vec<RawItem> = Vec::new();
        for (index, keyword) in keywords.into_iter().enumerate() {
            if items.len() >= limit {
                break;
            }
            let delay = if index > 0 {
                self.inter_request_delay
            } else {
                Duration::ZERO
            };
            if !items.is_empty() && Instant::now() + delay + self.budget.total() > deadline {
                tracing::warn!(
                    platform = %self.platform,
                    keyword = keyword.unwrap_or("-"),
                    collected = items.len(),
                    "next collector job would outlast the platform deadline, keeping partial results"
                );
                break;
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let body = Self::job_body(params, keyword, limit - items.len());
            let job = self.client.collect(&self.platform, &body, self.budget);
            let result = match tokio::time::timeout_at(deadline, job).await {
                Ok(result) => result.map_err(CollectError::from),
                Err(_) => Err(CollectError::Timeout(format!(
                    "collector job for {} passed the platform deadline",
                    self.platform
                ))),
            };
            match result {
                Ok(records) => {
                    let before = items.len();
                    items.extend(records.into_iter().filter_map(|record| match record {
                        Value::Object(map) => Some(map),
                        _ => None,
                    }));
                    tracing::debug!(
                        platform = %self.platform,
                        keyword = keyword.unwrap_or("-"),
                        count = items.len() - before,
                        "collector job returned"
                    );
                }
                Err(e) if items.is_empty() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        platform = %self.platform,
                        keyword = keyword.unwrap_or("-"),
                        error = %e,
                        collected = items.len(),
                        "collector job failed, keeping partial results"
                    );
                    break;
                }
            }
        }

        items.truncate(limit);
        Ok(items)
    }
}
