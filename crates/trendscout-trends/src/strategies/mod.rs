//! Browser-driven extraction, one strategy per platform.
//!
//! A strategy only knows where to go and how to read the page. The shared
//! [`collect`] driver owns navigation, the ready wait, pacing between
//! sub-requests and the item limit.

mod google_trends;
mod hacker_news;
mod product_hunt;
mod reddit;

use std::time::Duration;

pub use google_trends::GoogleTrends;
pub use hacker_news::HackerNews;
pub use product_hunt::ProductHunt;
pub use reddit::Reddit;

use scraper::{ElementRef, Selector};
use serde_json::Value;
use tokio::time::Instant;
use trendscout_browser::SessionGuard;
use trendscout_core::Platform;

use crate::error::CollectError;
use crate::types::{CollectParams, RawItem};

/// One page to visit during a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub url: String,
    /// The keyword this page was built from, if any.
    pub keyword: Option<String>,
}

impl Target {
    #[must_use]
    pub fn page(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            keyword: None,
        }
    }
}

pub trait ExtractionStrategy: Send + Sync {
    fn platform(&self) -> &'static str;

    /// Pages to visit, in the order given by the caller's keywords.
    fn targets(&self, params: &CollectParams) -> Vec<Target>;

    /// Selector that indicates the listing has rendered.
    fn ready_selector(&self) -> &'static str;

    /// Read at most `limit` records from a rendered page.
    fn parse(&self, html: &str, target: &Target, limit: usize) -> Vec<RawItem>;
}

/// Timeouts and pacing shared by every browser collection.
#[derive(Debug, Clone, Copy)]
pub struct BrowserSettings {
    pub navigation_timeout: Duration,
    pub ready_timeout: Duration,
    pub inter_request_delay: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(15),
            ready_timeout: Duration::from_secs(10),
            inter_request_delay: Duration::from_millis(2500),
        }
    }
}

/// The built-in strategy for `platform`, if there is one.
#[must_use]
pub fn strategy_for(platform: &Platform) -> Option<Box<dyn ExtractionStrategy>> {
    match platform.as_str() {
        Platform::GOOGLE_TRENDS => Some(Box::new(GoogleTrends)),
        Platform::HACKER_NEWS => Some(Box::new(HackerNews)),
        Platform::PRODUCT_HUNT => Some(Box::new(ProductHunt)),
        Platform::REDDIT => Some(Box::new(Reddit)),
        _ => None,
    }
}

/// Drive `strategy` over its targets using an already acquired session.
///
/// A target whose ready selector never appears contributes nothing. A failed
/// navigation aborts the collection when nothing has been read yet; after
/// that, the partial result is returned. Once records are in hand, a target
/// whose navigation and ready wait would run past `deadline` is skipped.
///
/// # Errors
///
/// Returns `Connection` or `Timeout` when the first navigation fails, and
/// `Extraction` when page content cannot be read.
pub async fn collect(
    strategy: &dyn ExtractionStrategy,
    session: &mut SessionGuard,
    params: &CollectParams,
    settings: &BrowserSettings,
    deadline: Instant,
) -> Result<Vec<RawItem>, CollectError> {
    let limit = params.bounded_limit();
    let platform = strategy.platform();
    let mut items: Vec<RawItem> = Vec::new();

    for (index, target) in strategy.targets(params).iter().enumerate() {
        if items.len() >= limit {
            break;
        }
        let delay = if index > 0 {
            settings.inter_request_delay
        } else {
            Duration::ZERO
        };
        let worst_case = delay + settings.navigation_timeout + settings.ready_timeout;
        if !items.is_empty() && Instant::now() + worst_case > deadline {
            tracing::warn!(
                platform,
                url = %target.url,
                collected = items.len(),
                "next page would outlast the platform deadline, keeping partial results"
            );
            break;
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        tracing::debug!(platform, url = %target.url, "navigating");
        if let Err(e) = session.navigate(&target.url, settings.navigation_timeout).await {
            if items.is_empty() {
                return Err(e.into());
            }
            tracing::warn!(
                platform,
                url = %target.url,
                error = %e,
                collected = items.len(),
                "navigation failed, keeping partial results"
            );
            break;
        }

        if !session
            .wait_for(strategy.ready_selector(), settings.ready_timeout)
            .await?
        {
            tracing::debug!(platform, url = %target.url, "ready selector never appeared");
            continue;
        }

        let html = session.content().await?;
        let parsed = strategy.parse(&html, target, limit - items.len());
        tracing::debug!(platform, url = %target.url, count = parsed.len(), "page parsed");
        items.extend(parsed);
    }

    items.truncate(limit);
    Ok(items)
}

/// Collapsed text of the first element matching `selector` under `el`.
pub(crate) fn text_of(el: ElementRef<'_>, selector: &Selector) -> Option<String> {
    el.select(selector).find_map(|child| {
        let text = child.text().collect::<Vec<_>>().join(" ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        (!text.is_empty()).then_some(text)
    })
}

pub(crate) fn attr_of(el: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    el.select(selector)
        .find_map(|child| child.value().attr(attr))
        .map(str::to_string)
}

/// Resolve a site-relative link against `origin`.
pub(crate) fn absolute_url(origin: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix('/') {
        format!("{}/{rest}", origin.trim_end_matches('/'))
    } else {
        format!("{}/{href}", origin.trim_end_matches('/'))
    }
}

pub(crate) fn insert_opt(raw: &mut RawItem, key: &str, value: Option<String>) {
    if let Some(v) = value {
        raw.insert(key.to_string(), Value::String(v));
    }
}

#[cfg(test)]
#[path = "collect_test.rs"]
mod tests;
