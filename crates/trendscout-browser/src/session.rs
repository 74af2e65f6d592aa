use std::time::Duration;

use async_trait::async_trait;

use crate::error::SessionError;

/// How often [`BrowserSession::wait_for`] re-checks the page.
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One live remote connection plus one page.
///
/// Sessions are never shared: each extraction acquires its own and closes it
/// before returning.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate the page to `url`, failing with `Connection` or `Timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), SessionError>;

    /// Whether at least one element matches `selector` right now.
    async fn has_element(&mut self, selector: &str) -> Result<bool, SessionError>;

    /// The rendered HTML of the current page.
    async fn content(&mut self) -> Result<String, SessionError>;

    /// Close the page and the remote connection. Calling it twice is a no-op.
    async fn close(&mut self) -> Result<(), SessionError>;

    /// Poll for `selector` until it appears or `timeout` elapses.
    ///
    /// Returns `Ok(false)` on timeout; the page simply has nothing to offer
    /// this round.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, SessionError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.has_element(selector).await? {
                return Ok(true);
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(READY_POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}

/// Opens new sessions against a remote browser endpoint.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// Short, credential-free description of the endpoint for logs.
    fn describe(&self) -> String;

    async fn acquire(&self) -> Result<Box<dyn BrowserSession>, SessionError>;
}
