//! Command handlers. Each loads the roster, builds the aggregator and reports
//! to stdout; diagnostics go through `tracing`.

use anyhow::Context;
use trendscout_browser::{SessionConnector, SessionGuard};
use trendscout_core::{load_platforms, AppConfig, Platform, PlatformsFile};
use trendscout_trends::registry::browser_connector;
use trendscout_trends::{build_aggregator, CollectError, CollectionReport, PlatformPlan};

fn load_roster(config: &AppConfig) -> anyhow::Result<PlatformsFile> {
    load_platforms(&config.platforms_path).with_context(|| {
        format!(
            "failed to load platform roster from {}",
            config.platforms_path.display()
        )
    })
}

/// Tags to collect: the ones asked for, or every enabled roster platform.
pub(crate) fn resolve_platforms(
    requested: &[String],
    roster: &PlatformsFile,
) -> anyhow::Result<Vec<Platform>> {
    if requested.is_empty() {
        let enabled = roster.enabled_tags();
        if enabled.is_empty() {
            anyhow::bail!("no enabled platforms in the roster; pass --platform TAG");
        }
        return Ok(enabled);
    }

    requested
        .iter()
        .map(|tag| Platform::new(tag).map_err(anyhow::Error::from))
        .collect()
}

pub(crate) fn render_report(report: &CollectionReport, pretty: bool) -> anyhow::Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    Ok(json)
}

pub(crate) fn plan_line(plan: &PlatformPlan) -> String {
    let method = plan
        .method
        .map_or_else(|| "fallback".to_string(), |m| m.to_string());
    match &plan.unavailable_reason {
        Some(reason) => format!("{:<16} {method:<9} {reason}", plan.platform),
        None => format!("{:<16} {method}", plan.platform),
    }
}

/// Run one collection and print the report.
///
/// # Errors
///
/// Fails only on configuration problems; per-platform failures are part of
/// the report.
pub(crate) async fn run_collect(
    config: &AppConfig,
    requested: &[String],
    pretty: bool,
) -> anyhow::Result<()> {
    let roster = load_roster(config)?;
    let platforms = resolve_platforms(requested, &roster)?;
    let aggregator = build_aggregator(config, &roster);

    let report = aggregator.collect_all(&platforms).await;
    for (platform, reason) in report.degraded() {
        tracing::info!(platform = %platform, reason = %reason, "served fallback data");
    }
    tracing::info!(
        total = report.total_items(),
        fallback = report.fallback_count(),
        "collection complete"
    );

    println!("{}", render_report(&report, pretty)?);
    Ok(())
}

pub(crate) fn run_platforms(config: &AppConfig) -> anyhow::Result<()> {
    let roster = load_roster(config)?;
    let aggregator = build_aggregator(config, &roster);
    for plan in aggregator.plan() {
        println!("{}", plan_line(&plan));
    }
    Ok(())
}

/// Acquire and release a single browser session.
///
/// # Errors
///
/// Returns an error naming the failure category when no session could be
/// opened.
pub(crate) async fn run_check_browser(config: &AppConfig) -> anyhow::Result<()> {
    let connector = browser_connector(config).map_err(anyhow::Error::msg)?;
    let target = connector.describe();

    match SessionGuard::acquire(&connector, "check-browser").await {
        Ok(session) => {
            session.release().await;
            println!("browser session ok: {target}");
            Ok(())
        }
        Err(e) => {
            let err = CollectError::from(e);
            anyhow::bail!("browser check failed ({}): {err}", err.category())
        }
    }
}
