//! Remote headless-browser sessions.
//!
//! A [`SessionConnector`] hands out exclusively-owned [`BrowserSession`]s;
//! callers hold them through a [`SessionGuard`] so the remote session is
//! closed on every exit path.

pub mod cdp;
pub mod error;
pub mod guard;
pub mod session;

pub use cdp::CdpConnector;
pub use error::SessionError;
pub use guard::SessionGuard;
pub use session::{BrowserSession, SessionConnector, READY_POLL_INTERVAL};
