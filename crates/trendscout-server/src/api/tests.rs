use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::response::Response;
use tower::ServiceExt;
use trendscout_core::{parse_platforms, Platform};
use trendscout_trends::AggregatorSettings;

use super::*;

fn test_state() -> AppState {
    let roster = parse_platforms(
        "platforms:\n  - tag: google-trends\n  - tag: reddit\n  - tag: twitter\n    enabled: false\n",
    )
    .expect("roster");
    let mut aggregator = Aggregator::new(AggregatorSettings::default());
    for entry in &roster.platforms {
        aggregator.mark_unavailable(entry.tag.clone(), "no credentials in tests");
    }
    AppState {
        aggregator: Arc::new(aggregator),
        roster: Arc::new(roster),
    }
}

fn open_app() -> Router {
    let auth = AuthState::from_keys("", true).expect("auth");
    build_app(test_state(), &auth, RateLimits::default())
}

fn limits(collection: usize, reads: usize) -> RateLimits {
    RateLimits {
        collection: RateLimiter::new(collection, Duration::from_secs(60)),
        reads: RateLimiter::new(reads, Duration::from_secs(60)),
    }
}

async fn send_as(app: Router, uri: &str, token: Option<&str>) -> Response {
    let mut request = Request::builder().uri(uri);
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {token}"));
    }
    app.oneshot(request.body(Body::empty()).expect("request"))
        .await
        .expect("response")
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    (status, serde_json::from_slice(&body).expect("json parse"))
}

#[test]
fn api_error_validation_error_maps_to_bad_request() {
    let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_platform_counts() {
    let (status, json) = get_json(open_app(), "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["live_platforms"], 0);
    assert_eq!(json["data"]["fallback_platforms"], 3);
    assert!(json["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn request_id_is_echoed() {
    let response = open_app()
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("x-request-id", "req-abc")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-abc")
    );
}

#[tokio::test]
async fn trends_without_credentials_are_all_fallback() {
    let (status, json) = get_json(open_app(), "/api/v1/trends?platforms=google-trends,reddit").await;
    assert_eq!(status, StatusCode::OK);

    let platforms = json["data"]["platforms"].as_object().expect("platforms map");
    assert_eq!(platforms.len(), 2);
    for (tag, entry) in platforms {
        assert_eq!(entry["status"], "degraded", "{tag}");
        assert_eq!(entry["degraded_reason"]["kind"], "unconfigured");
        let trends = entry["trends"].as_array().expect("trends array");
        assert!(!trends.is_empty());
        assert!(trends.iter().all(|t| t["source"] == "fallback"));
    }
    assert!(json["data"]["total_items"].as_u64().unwrap_or_default() >= 2);
}

#[tokio::test]
async fn trends_default_to_enabled_roster() {
    let (status, json) = get_json(open_app(), "/api/v1/trends").await;
    assert_eq!(status, StatusCode::OK);
    let platforms = json["data"]["platforms"].as_object().expect("platforms map");
    let mut tags: Vec<&str> = platforms.keys().map(String::as_str).collect();
    tags.sort_unstable();
    assert_eq!(tags, vec!["google-trends", "reddit"]);
}

#[tokio::test]
async fn invalid_platform_is_a_validation_error() {
    let (status, json) = get_json(open_app(), "/api/v1/trends?platforms=bad/tag").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn platforms_lists_plan() {
    let (status, json) = get_json(open_app(), "/api/v1/platforms").await;
    assert_eq!(status, StatusCode::OK);
    let data = json["data"].as_array().expect("plan array");
    assert_eq!(data.len(), 3);
    assert_eq!(data[0]["platform"], Platform::GOOGLE_TRENDS);
    assert_eq!(data[0]["unavailable_reason"], "no credentials in tests");
}

#[tokio::test]
async fn protected_routes_require_bearer_token() {
    let auth = AuthState::from_keys("secret-key", false).expect("auth");
    let app = build_app(test_state(), &auth, RateLimits::default());

    let (status, json) = get_json(app.clone(), "/api/v1/trends?platforms=reddit").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");

    let response =
        send_as(app.clone(), "/api/v1/trends?platforms=reddit", Some("secret-key")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = get_json(app, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK, "health stays public");
}

#[tokio::test]
async fn rate_limit_applies_to_protected_routes() {
    let auth = AuthState::from_keys("", true).expect("auth");
    let app = build_app(test_state(), &auth, limits(6, 2));

    for _ in 0..2 {
        let (status, _) = get_json(app.clone(), "/api/v1/platforms").await;
        assert_eq!(status, StatusCode::OK);
    }
    let response = send_as(app.clone(), "/api/v1/platforms", None).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .expect("retry-after seconds");
    assert!((1..=60).contains(&retry_after), "retry-after was {retry_after}");

    let (status, json) = get_json(app, "/api/v1/platforms").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"]["code"], "rate_limited");
}

#[tokio::test]
async fn each_key_has_its_own_budget() {
    let auth = AuthState::from_keys("alpha,beta", false).expect("auth");
    let app = build_app(test_state(), &auth, limits(6, 1));

    let first = send_as(app.clone(), "/api/v1/platforms", Some("alpha")).await;
    assert_eq!(first.status(), StatusCode::OK);
    let again = send_as(app.clone(), "/api/v1/platforms", Some("alpha")).await;
    assert_eq!(again.status(), StatusCode::TOO_MANY_REQUESTS);

    let other = send_as(app, "/api/v1/platforms", Some("beta")).await;
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn rejected_tokens_spend_no_budget() {
    let auth = AuthState::from_keys("alpha", false).expect("auth");
    let app = build_app(test_state(), &auth, limits(6, 1));

    for _ in 0..3 {
        let denied = send_as(app.clone(), "/api/v1/platforms", Some("wrong")).await;
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
    }
    let allowed = send_as(app, "/api/v1/platforms", Some("alpha")).await;
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn collection_and_reads_are_budgeted_separately() {
    let auth = AuthState::from_keys("", true).expect("auth");
    let app = build_app(test_state(), &auth, limits(1, 5));

    let trends = send_as(app.clone(), "/api/v1/trends?platforms=reddit", None).await;
    assert_eq!(trends.status(), StatusCode::OK);
    let trends = send_as(app.clone(), "/api/v1/trends?platforms=reddit", None).await;
    assert_eq!(trends.status(), StatusCode::TOO_MANY_REQUESTS);

    let reads = send_as(app, "/api/v1/platforms", None).await;
    assert_eq!(reads.status(), StatusCode::OK);
}
