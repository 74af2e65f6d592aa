use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, RETRY_AFTER},
        HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

const API_KEYS_VAR: &str = "TRENDSCOUT_API_KEYS";
const ANONYMOUS: &str = "anonymous";

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Who is calling, as a label safe to log: `key-1`, `key-2`, ... in the
/// order keys were configured, or `anonymous` when auth is off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub String);

/// Bearer tokens accepted by the protected routes.
#[derive(Debug, Clone)]
pub struct AuthState {
    /// token -> caller label
    callers: Arc<HashMap<String, String>>,
    pub enabled: bool,
}

impl AuthState {
    /// Reads comma-separated bearer tokens from `TRENDSCOUT_API_KEYS`.
    ///
    /// # Errors
    ///
    /// Fails outside development when no keys are configured.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        Self::from_keys(&std::env::var(API_KEYS_VAR).unwrap_or_default(), is_development)
    }

    /// An empty key list turns auth off in development and is a startup
    /// error anywhere else.
    ///
    /// # Errors
    ///
    /// Fails outside development when `raw` holds no keys.
    pub fn from_keys(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let mut callers = HashMap::new();
        for token in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let label = format!("key-{}", callers.len() + 1);
            callers.entry(token.to_owned()).or_insert(label);
        }

        if callers.is_empty() {
            anyhow::ensure!(
                is_development,
                "{API_KEYS_VAR} is required outside development; provide comma-separated bearer tokens"
            );
            tracing::warn!("{API_KEYS_VAR} not set; bearer auth disabled in development environment");
        }

        Ok(Self {
            enabled: !callers.is_empty(),
            callers: Arc::new(callers),
        })
    }

    fn caller_for(&self, token: &str) -> Option<Caller> {
        self.callers.get(token).cloned().map(Caller)
    }
}

#[derive(Debug)]
struct Window {
    started_at: Instant,
    count: usize,
}

/// Fixed-window request budget, counted separately for each [`Caller`].
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Counts one request for `caller`. `Err` carries the time until the
    /// caller's window resets.
    async fn admit(&self, caller: &str) -> Result<(), Duration> {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        let window = windows.entry(caller.to_owned()).or_insert(Window {
            started_at: now,
            count: 0,
        });

        let elapsed = now.duration_since(window.started_at);
        if elapsed >= self.window {
            window.started_at = now;
            window.count = 0;
        }
        if window.count >= self.max_requests {
            return Err(self.window.saturating_sub(elapsed));
        }
        window.count += 1;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

fn reject(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(MiddlewareErrorBody {
            error: MiddlewareError { code, message },
        }),
    )
        .into_response()
}

/// Reuses an incoming `x-request-id` or generates a `UUIDv4`, stores it as a
/// [`RequestId`] extension and echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Resolves the [`Caller`] for the request, rejecting unknown tokens when
/// auth is enabled.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let caller = if auth.enabled {
        let caller = extract_bearer_token(req.headers().get(AUTHORIZATION))
            .and_then(|token| auth.caller_for(token));
        match caller {
            Some(caller) => caller,
            None => {
                return reject(
                    StatusCode::UNAUTHORIZED,
                    "unauthorized",
                    "missing or invalid bearer token",
                )
            }
        }
    } else {
        Caller(ANONYMOUS.to_owned())
    };

    req.extensions_mut().insert(caller);
    next.run(req).await
}

/// Applies the caller's request budget. Runs after [`require_bearer_auth`].
pub async fn enforce_rate_limit(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    let caller = req
        .extensions()
        .get::<Caller>()
        .map_or(ANONYMOUS, |c| c.0.as_str())
        .to_owned();

    if let Err(retry_after) = limiter.admit(&caller).await {
        tracing::warn!(caller = %caller, path = %req.uri().path(), "rate limit exceeded");
        let mut res = reject(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded",
        );
        let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
        res.headers_mut().insert(RETRY_AFTER, HeaderValue::from(secs.max(1)));
        return res;
    }

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
        assert_eq!(extract_bearer_token(None), None);
    }

    #[test]
    fn auth_disabled_without_keys_in_development() {
        let state = AuthState::from_keys("", true).expect("dev should allow missing keys");
        assert!(!state.enabled);
    }

    #[test]
    fn auth_required_outside_development() {
        assert!(AuthState::from_keys(" , ", false).is_err());
    }

    #[test]
    fn keys_get_stable_caller_labels() {
        let state = AuthState::from_keys(" alpha ,beta,alpha,", false).unwrap();
        assert!(state.enabled);
        assert_eq!(state.caller_for("alpha"), Some(Caller("key-1".into())));
        assert_eq!(state.caller_for("beta"), Some(Caller("key-2".into())));
        assert_eq!(state.caller_for(""), None);
    }

    #[tokio::test]
    async fn budgets_are_per_caller() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.admit("key-1").await.is_ok());
        assert!(limiter.admit("key-1").await.is_err());
        assert!(limiter.admit("key-2").await.is_ok());
    }

    #[tokio::test]
    async fn window_resets_after_it_elapses() {
        let limiter = RateLimiter::new(1, Duration::from_millis(50));
        assert!(limiter.admit("key-1").await.is_ok());
        let retry = limiter.admit("key-1").await.unwrap_err();
        assert!(retry <= Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(limiter.admit("key-1").await.is_ok());
    }
}
