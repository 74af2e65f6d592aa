use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trendscout_core::Platform;
use trendscout_trends::{
    CollectionReport, DegradeReason, PlatformPlan, PlatformStatus, TrendItem,
};

use super::{ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct TrendsQuery {
    /// Comma-separated platform tags.
    platforms: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct PlatformTrends {
    status: PlatformStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    degraded_reason: Option<DegradeReason>,
    trends: Vec<TrendItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct TrendsData {
    platforms: BTreeMap<Platform, PlatformTrends>,
    total_items: usize,
    collected_at: DateTime<Utc>,
}

impl From<CollectionReport> for TrendsData {
    fn from(report: CollectionReport) -> Self {
        let total_items = report.total_items();
        let platforms = report
            .platforms
            .into_iter()
            .map(|(platform, outcome)| {
                (
                    platform,
                    PlatformTrends {
                        status: outcome.status,
                        degraded_reason: outcome.degraded_reason,
                        trends: outcome.items,
                    },
                )
            })
            .collect();
        Self {
            platforms,
            total_items,
            collected_at: report.collected_at,
        }
    }
}

/// Empty or missing means "every enabled roster platform".
fn parse_platform_list(raw: Option<&str>) -> Result<Vec<Platform>, String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|tag| Platform::new(tag).map_err(|e| e.to_string()))
        .collect()
}

pub(super) async fn get_trends(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<ApiResponse<TrendsData>>, ApiError> {
    let requested = parse_platform_list(query.platforms.as_deref())
        .map_err(|message| ApiError::new(req_id.0.clone(), "validation_error", message))?;
    let platforms = if requested.is_empty() {
        state.roster.enabled_tags()
    } else {
        requested
    };

    tracing::info!(request_id = %req_id.0, platforms = platforms.len(), "trends requested");
    let report = state.aggregator.collect_all(&platforms).await;

    Ok(Json(ApiResponse {
        data: TrendsData::from(report),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_platforms(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<PlatformPlan>>> {
    Json(ApiResponse {
        data: state.aggregator.plan(),
        meta: ResponseMeta::new(req_id.0),
    })
}
