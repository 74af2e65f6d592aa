//! Builds an [`Aggregator`] from runtime config and the platform roster.

use std::collections::HashMap;
use std::sync::Arc;

use trendscout_browser::{CdpConnector, SessionConnector};
use trendscout_collector::{CollectorClient, PollBudget};
use trendscout_core::{AppConfig, Platform, PlatformsFile};

use crate::aggregator::{Aggregator, AggregatorSettings};
use crate::collectors::{BrowserCollector, JobCollector};
use crate::strategies::{strategy_for, BrowserSettings};
use crate::types::CollectParams;

const TRIGGER_BACKOFF_BASE_MS: u64 = 1_000;

/// Browser settings derived from `config`.
#[must_use]
pub fn browser_settings(config: &AppConfig) -> BrowserSettings {
    BrowserSettings {
        navigation_timeout: config.navigation_timeout(),
        ready_timeout: config.ready_timeout(),
        inter_request_delay: config.inter_request_delay(),
    }
}

/// The remote browser connector, or the reason there is none.
///
/// # Errors
///
/// Returns a human-readable reason when the endpoint is unset or invalid.
pub fn browser_connector(config: &AppConfig) -> Result<CdpConnector, String> {
    let endpoint = config
        .browser_endpoint
        .as_deref()
        .ok_or_else(|| "TRENDSCOUT_BROWSER_ENDPOINT not set".to_string())?;
    CdpConnector::new(endpoint, config.request_timeout(), config.connect_max_retries)
        .map_err(|e| e.to_string())
}

fn collector_client(config: &AppConfig, roster: &PlatformsFile) -> Result<CollectorClient, String> {
    let api_key = config
        .collector_api_key
        .as_deref()
        .ok_or_else(|| "TRENDSCOUT_COLLECTOR_API_KEY not set".to_string())?;

    let collectors: HashMap<Platform, String> = roster
        .platforms
        .iter()
        .filter_map(|p| p.collector_id.clone().map(|id| (p.tag.clone(), id)))
        .collect();

    CollectorClient::with_base_url(
        api_key,
        config.request_timeout_secs,
        &config.collector_base_url,
        collectors,
    )
    .map(|client| client.with_retry(config.connect_max_retries, TRIGGER_BACKOFF_BASE_MS))
    .map_err(|e| e.to_string())
}

/// Register every roster entry with the live method it can use.
///
/// Built-in strategies need the browser endpoint; entries with a
/// `collector_id` need the collector API key. Anything that cannot be
/// collected live is marked unavailable with the reason, and later degrades
/// to fallback data without a network attempt.
#[must_use]
pub fn build_aggregator(config: &AppConfig, roster: &PlatformsFile) -> Aggregator {
    let mut aggregator = Aggregator::new(AggregatorSettings {
        max_concurrent: config.max_concurrent_platforms,
        platform_timeout: config.platform_timeout(),
    });

    let connector: Result<Arc<dyn SessionConnector>, String> = browser_connector(config)
        .map(|c| Arc::new(c) as Arc<dyn SessionConnector>);
    if let Err(reason) = &connector {
        tracing::warn!(reason = %reason, "browser collection disabled");
    }

    let client = collector_client(config, roster).map(Arc::new);
    if let Err(reason) = &client {
        tracing::warn!(reason = %reason, "collector jobs disabled");
    }

    let settings = browser_settings(config);
    let budget = PollBudget::new(config.poll_max_attempts, config.poll_interval());

    for entry in &roster.platforms {
        let platform = entry.tag.clone();
        if !entry.enabled {
            aggregator.mark_unavailable(platform, "disabled in platform roster");
            continue;
        }

        let params = CollectParams::from_config(entry);
        if let Some(strategy) = strategy_for(&platform) {
            match &connector {
                Ok(connector) => aggregator.register(
                    platform.clone(),
                    Arc::new(BrowserCollector::new(
                        platform,
                        strategy,
                        Arc::clone(connector),
                        settings,
                    )),
                    params,
                ),
                Err(reason) => aggregator.mark_unavailable(platform, reason.clone()),
            }
        } else if entry.collector_id.is_some() {
            match &client {
                Ok(client) => aggregator.register(
                    platform.clone(),
                    Arc::new(JobCollector::new(
                        platform,
                        Arc::clone(client),
                        budget,
                        config.inter_request_delay(),
                    )),
                    params,
                ),
                Err(reason) => aggregator.mark_unavailable(platform, reason.clone()),
            }
        } else {
            aggregator.mark_unavailable(platform, "no collection method configured");
        }
    }

    aggregator
}
