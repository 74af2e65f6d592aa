//! Best-effort fan-out across platforms.
//!
//! Every requested platform ends up in the report, either `Live` or
//! `Degraded` with fallback items and the reason it degraded. Each platform
//! runs in its own task under its own timeout, so one platform's error, panic
//! or stall never reaches the others.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use trendscout_core::Platform;

use crate::collectors::{CollectionMethod, TrendCollector};
use crate::error::ErrorCategory;
use crate::fallback;
use crate::normalize::normalize_all;
use crate::types::{CollectParams, ItemSource, TrendItem};

#[derive(Debug, Clone, Copy)]
pub struct AggregatorSettings {
    /// Platforms collected at the same time, at least 1.
    pub max_concurrent: usize,
    /// Ceiling for one platform's whole live collection.
    pub platform_timeout: Duration,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            platform_timeout: Duration::from_secs(120),
        }
    }
}

/// Why a platform's items are synthetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DegradeReason {
    /// No live method could even be attempted.
    Unconfigured { reason: String },
    /// A live attempt was made and failed.
    Failed {
        category: ErrorCategory,
        message: String,
    },
    /// The live source answered with nothing.
    Empty,
}

impl std::fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unconfigured { reason } => write!(f, "unconfigured: {reason}"),
            Self::Failed { category, message } => write!(f, "{category}: {message}"),
            Self::Empty => write!(f, "live collection returned no items"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformStatus {
    Live,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformOutcome {
    pub status: PlatformStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<DegradeReason>,
    pub items: Vec<TrendItem>,
}

impl PlatformOutcome {
    fn live(items: Vec<TrendItem>) -> Self {
        Self {
            status: PlatformStatus::Live,
            degraded_reason: None,
            items,
        }
    }

    fn degraded(platform: &Platform, reason: DegradeReason, at: DateTime<Utc>) -> Self {
        tracing::warn!(platform = %platform, reason = %reason, "platform degraded to fallback data");
        Self {
            status: PlatformStatus::Degraded,
            degraded_reason: Some(reason),
            items: fallback::generate(platform, at),
        }
    }
}

/// Result of one [`Aggregator::collect_all`] call.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionReport {
    pub collected_at: DateTime<Utc>,
    pub platforms: BTreeMap<Platform, PlatformOutcome>,
}

impl CollectionReport {
    /// Degraded platforms and why.
    #[must_use]
    pub fn degraded(&self) -> Vec<(&Platform, &DegradeReason)> {
        self.platforms
            .iter()
            .filter_map(|(p, o)| o.degraded_reason.as_ref().map(|r| (p, r)))
            .collect()
    }

    /// Items produced by the fallback provider.
    #[must_use]
    pub fn fallback_count(&self) -> usize {
        self.platforms
            .values()
            .flat_map(|o| &o.items)
            .filter(|i| i.source == ItemSource::Fallback)
            .count()
    }

    #[must_use]
    pub fn total_items(&self) -> usize {
        self.platforms.values().map(|o| o.items.len()).sum()
    }

    /// Flatten to `{platform: items}`.
    #[must_use]
    pub fn into_feed(self) -> BTreeMap<Platform, Vec<TrendItem>> {
        self.platforms
            .into_iter()
            .map(|(p, o)| (p, o.items))
            .collect()
    }
}

/// How a platform would be collected right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformPlan {
    pub platform: Platform,
    pub method: Option<CollectionMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,
}

enum Entry {
    Collector {
        collector: Arc<dyn TrendCollector>,
        params: CollectParams,
    },
    Unavailable(String),
}

pub struct Aggregator {
    settings: AggregatorSettings,
    entries: HashMap<Platform, Entry>,
}

impl Aggregator {
    #[must_use]
    pub fn new(settings: AggregatorSettings) -> Self {
        Self {
            settings,
            entries: HashMap::new(),
        }
    }

    /// Register the live collector for `platform`, replacing any earlier
    /// registration.
    pub fn register(
        &mut self,
        platform: Platform,
        collector: Arc<dyn TrendCollector>,
        params: CollectParams,
    ) {
        self.entries
            .insert(platform, Entry::Collector { collector, params });
    }

    /// Record that `platform` cannot be collected live and why.
    pub fn mark_unavailable(&mut self, platform: Platform, reason: impl Into<String>) {
        self.entries.insert(platform, Entry::Unavailable(reason.into()));
    }

    #[must_use]
    pub fn settings(&self) -> AggregatorSettings {
        self.settings
    }

    /// Every known platform, sorted by tag.
    #[must_use]
    pub fn plan(&self) -> Vec<PlatformPlan> {
        let mut plan: Vec<PlatformPlan> = self
            .entries
            .iter()
            .map(|(platform, entry)| match entry {
                Entry::Collector { collector, .. } => PlatformPlan {
                    platform: platform.clone(),
                    method: Some(collector.method()),
                    unavailable_reason: None,
                },
                Entry::Unavailable(reason) => PlatformPlan {
                    platform: platform.clone(),
                    method: None,
                    unavailable_reason: Some(reason.clone()),
                },
            })
            .collect();
        plan.sort_by(|a, b| a.platform.cmp(&b.platform));
        plan
    }

    /// Collect every platform in `platforms`. Never fails: each requested
    /// platform appears in the report exactly once.
    pub async fn collect_all(&self, platforms: &[Platform]) -> CollectionReport {
        let collected_at = Utc::now();
        let started = Instant::now();

        let mut seen = HashSet::new();
        let requested: Vec<Platform> = platforms
            .iter()
            .filter(|p| seen.insert((*p).clone()))
            .cloned()
            .collect();

        tracing::info!(
            platforms = requested.len(),
            max_concurrent = self.settings.max_concurrent,
            "collecting trends"
        );

        let platforms: BTreeMap<Platform, PlatformOutcome> = stream::iter(requested)
            .map(|platform| async move {
                let outcome = self.collect_one(&platform, collected_at).await;
                (platform, outcome)
            })
            .buffer_unordered(self.settings.max_concurrent.max(1))
            .collect()
            .await;

        let report = CollectionReport {
            collected_at,
            platforms,
        };
        tracing::info!(
            platforms = report.platforms.len(),
            degraded = report.degraded().len(),
            items = report.total_items(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "trend collection finished"
        );
        report
    }

    async fn collect_one(&self, platform: &Platform, at: DateTime<Utc>) -> PlatformOutcome {
        let (collector, params) = match self.entries.get(platform) {
            Some(Entry::Collector { collector, params }) => (Arc::clone(collector), params.clone()),
            Some(Entry::Unavailable(reason)) => {
                return PlatformOutcome::degraded(
                    platform,
                    DegradeReason::Unconfigured {
                        reason: reason.clone(),
                    },
                    at,
                );
            }
            None => {
                return PlatformOutcome::degraded(
                    platform,
                    DegradeReason::Unconfigured {
                        reason: "no collector registered".to_string(),
                    },
                    at,
                );
            }
        };

        let timeout = self.settings.platform_timeout;
        let deadline = tokio::time::Instant::now() + timeout;
        tracing::debug!(platform = %platform, method = %collector.method(), "collecting platform");
        let task = tokio::spawn(async move {
            tokio::time::timeout_at(deadline, async {
                collector.collect(&params, deadline).await
            })
            .await
        });

        let reason = match task.await {
            Ok(Ok(Ok(raws))) if !raws.is_empty() => {
                let items = normalize_all(platform, &raws, at);
                tracing::info!(platform = %platform, items = items.len(), "platform collected live");
                return PlatformOutcome::live(items);
            }
            Ok(Ok(Ok(_))) => DegradeReason::Empty,
            Ok(Ok(Err(e))) => DegradeReason::Failed {
                category: e.category(),
                message: e.to_string(),
            },
            Ok(Err(_)) => DegradeReason::Failed {
                category: ErrorCategory::Timeout,
                message: format!(
                    "no result within {}ms",
                    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
                ),
            },
            Err(join) => DegradeReason::Failed {
                category: ErrorCategory::Collection,
                message: if join.is_panic() {
                    "collector task panicked".to_string()
                } else {
                    "collector task was cancelled".to_string()
                },
            },
        };
        PlatformOutcome::degraded(platform, reason, at)
    }
}

#[cfg(test)]
#[path = "aggregator_test.rs"]
mod tests;
