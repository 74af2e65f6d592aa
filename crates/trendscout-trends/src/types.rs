use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trendscout_core::{Platform, PlatformConfig, DEFAULT_ITEMS_PER_PLATFORM, MAX_ITEMS_PER_PLATFORM};

/// One record as read from a page or returned by a collector job.
pub type RawItem = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    Post,
    Video,
    TrendTopic,
    Article,
    Image,
    Newsletter,
    Review,
    Track,
}

/// Whether an item came from a live source or the synthetic fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSource {
    Live,
    Fallback,
}

/// Canonical normalized record of one piece of trending content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendItem {
    /// Stable hash of platform, url and title.
    pub id: String,
    pub platform: Platform,
    pub kind: ContentKind,
    pub title: String,
    pub body: String,
    pub url: Option<String>,
    /// Finite and non-negative.
    pub engagement: f64,
    pub tags: BTreeSet<String>,
    /// When the item was collected, not when it was published.
    pub captured_at: DateTime<Utc>,
    /// Platform-native counters exactly as received.
    pub raw_metrics: BTreeMap<String, Value>,
    pub source: ItemSource,
}

/// Inputs for one platform's collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectParams {
    /// Keywords, hashtags or subreddits; sub-requests follow this order.
    pub keywords: Vec<String>,
    /// Upper bound on records returned, at most `MAX_ITEMS_PER_PLATFORM`.
    pub limit: usize,
    /// Extra collector parameters, always a JSON object when present.
    pub extra: Option<Value>,
}

impl Default for CollectParams {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            limit: DEFAULT_ITEMS_PER_PLATFORM,
            extra: None,
        }
    }
}

impl CollectParams {
    #[must_use]
    pub fn from_config(config: &PlatformConfig) -> Self {
        Self {
            keywords: config.keywords.clone(),
            limit: config.item_limit(),
            extra: config.params.clone(),
        }
    }

    /// The limit clamped to `1..=MAX_ITEMS_PER_PLATFORM`.
    #[must_use]
    pub fn bounded_limit(&self) -> usize {
        self.limit.clamp(1, MAX_ITEMS_PER_PLATFORM)
    }
}
