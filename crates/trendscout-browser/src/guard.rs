//! Scoped acquisition of a [`BrowserSession`].
//!
//! [`SessionGuard::release`] closes the session on the normal path. A guard
//! dropped without release (an early `?` return, or the enclosing future being
//! cancelled by a timeout) schedules the close on the current runtime instead,
//! so a remote session never outlives the call that opened it.

use std::time::Duration;

use crate::error::SessionError;
use crate::session::{BrowserSession, SessionConnector};

pub struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
    label: String,
}

impl SessionGuard {
    /// Acquire a new session from `connector`.
    ///
    /// # Errors
    ///
    /// Propagates the connector's `SessionError`.
    pub async fn acquire(
        connector: &dyn SessionConnector,
        label: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let label = label.into();
        let session = connector.acquire().await?;
        tracing::debug!(session = %label, endpoint = %connector.describe(), "browser session acquired");
        Ok(Self {
            session: Some(session),
            label,
        })
    }

    fn session(&mut self) -> Result<&mut Box<dyn BrowserSession>, SessionError> {
        self.session
            .as_mut()
            .ok_or_else(|| SessionError::Connection(format!("session {} already released", self.label)))
    }

    /// # Errors
    ///
    /// Returns `Connection` or `Timeout` when navigation fails.
    pub async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), SessionError> {
        self.session()?.navigate(url, timeout).await
    }

    /// # Errors
    ///
    /// Returns an error only when the page cannot be queried at all.
    pub async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, SessionError> {
        self.session()?.wait_for(selector, timeout).await
    }

    /// # Errors
    ///
    /// Returns `Extraction` when the page HTML cannot be read.
    pub async fn content(&mut self) -> Result<String, SessionError> {
        self.session()?.content().await
    }

    /// Close the session. Close failures are logged, not returned: the
    /// remote side drops idle sessions on its own.
    pub async fn release(mut self) {
        if let Some(mut session) = self.session.take() {
            match session.close().await {
                Ok(()) => tracing::debug!(session = %self.label, "browser session released"),
                Err(e) => {
                    tracing::warn!(session = %self.label, error = %e, "browser session close failed");
                }
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        let label = std::mem::take(&mut self.label);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        tracing::warn!(session = %label, error = %e, "browser session drop cleanup failed");
                    } else {
                        tracing::debug!(session = %label, "browser session closed on drop");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(session = %label, "no runtime available to close dropped browser session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct Counters {
        acquired: AtomicU32,
        closed: AtomicU32,
    }

    struct CountingSession {
        counters: Arc<Counters>,
        closed: bool,
    }

    #[async_trait]
    impl BrowserSession for CountingSession {
        async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<(), SessionError> {
            if url.contains("unreachable") {
                return Err(SessionError::Connection("connection refused".to_string()));
            }
            Ok(())
        }

        async fn has_element(&mut self, _selector: &str) -> Result<bool, SessionError> {
            Ok(true)
        }

        async fn content(&mut self) -> Result<String, SessionError> {
            Ok("<html></html>".to_string())
        }

        async fn close(&mut self) -> Result<(), SessionError> {
            if !self.closed {
                self.closed = true;
                self.counters.closed.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    struct CountingConnector {
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl SessionConnector for CountingConnector {
        fn describe(&self) -> String {
            "counting".to_string()
        }

        async fn acquire(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
            self.counters.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingSession {
                counters: Arc::clone(&self.counters),
                closed: false,
            }))
        }
    }

    fn connector() -> (CountingConnector, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (
            CountingConnector {
                counters: Arc::clone(&counters),
            },
            counters,
        )
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn release_closes_session_once() {
        let (connector, counters) = connector();
        let mut guard = SessionGuard::acquire(&connector, "test").await.unwrap();
        guard
            .navigate("https://example.com", Duration::from_secs(1))
            .await
            .unwrap();
        guard.release().await;
        settle().await;

        assert_eq!(counters.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn early_return_on_error_still_closes_session() {
        async fn use_session(connector: &CountingConnector) -> Result<String, SessionError> {
            let mut guard = SessionGuard::acquire(connector, "failing").await?;
            guard
                .navigate("https://unreachable.invalid", Duration::from_secs(1))
                .await?;
            let html = guard.content().await?;
            guard.release().await;
            Ok(html)
        }

        let (connector, counters) = connector();
        let result = use_session(&connector).await;
        assert!(matches!(result, Err(SessionError::Connection(_))));
        settle().await;

        assert_eq!(counters.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_future_closes_session() {
        let (connector, counters) = connector();
        let work = async {
            let _guard = SessionGuard::acquire(&connector, "cancelled").await?;
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<(), SessionError>(())
        };

        let outcome = tokio::time::timeout(Duration::from_millis(50), work).await;
        assert!(outcome.is_err(), "work should have been cancelled");
        settle().await;

        assert_eq!(counters.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }
}
