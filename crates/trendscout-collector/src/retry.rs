//! Retry with exponential back-off and jitter for collector triggers.
//!
//! Only connection-class failures are retried. A rejected key or a bad
//! request fails the same way on every attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::CollectorError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** timeouts, connect failures, HTTP 5xx and 429.
///
/// **Not retriable:** configuration errors, 4xx responses, remote job
/// failures, malformed bodies.
pub(crate) fn is_retriable(err: &CollectorError) -> bool {
    match err {
        CollectorError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        CollectorError::Api { status, .. } => *status >= 500 || *status == 429,
        CollectorError::Configuration(_)
        | CollectorError::Collection { .. }
        | CollectorError::Timeout { .. }
        | CollectorError::Deserialize { .. } => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// The delay before retry `n` is `backoff_base_ms × 2ⁿ⁻¹` with ±25 % jitter,
/// capped at 30 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, CollectorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CollectorError>>,
{
    const MAX_DELAY_MS: u64 = 30_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "collector transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn configuration_error_is_not_retriable() {
        assert!(!is_retriable(&CollectorError::Configuration(
            "no collector".to_owned()
        )));
    }

    #[test]
    fn client_error_is_not_retriable() {
        assert!(!is_retriable(&CollectorError::Api {
            status: 401,
            message: "bad key".to_owned()
        }));
    }

    #[test]
    fn server_error_and_throttling_are_retriable() {
        assert!(is_retriable(&CollectorError::Api {
            status: 503,
            message: String::new()
        }));
        assert!(is_retriable(&CollectorError::Api {
            status: 429,
            message: String::new()
        }));
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(1, 0, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(CollectorError::Api {
                        status: 502,
                        message: "bad gateway".to_owned(),
                    })
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(1, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(CollectorError::Api {
                    status: 500,
                    message: "boom".to_owned(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(CollectorError::Api { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2, "one try plus one retry");
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let _ = retry_with_backoff(0, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(CollectorError::Api {
                    status: 503,
                    message: String::new(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
