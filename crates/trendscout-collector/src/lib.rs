//! Client for submit-then-poll collection backends.
//!
//! A collection is started with [`CollectorClient::trigger`], which returns a
//! [`CollectorJob`] holding the remote snapshot id, and finished with
//! [`CollectorClient::poll`], which waits for the snapshot under an explicit
//! [`PollBudget`].

pub mod client;
pub mod error;
pub(crate) mod retry;
pub mod types;

pub use client::{CollectorClient, DEFAULT_BASE_URL};
pub use error::CollectorError;
pub use types::{CollectorJob, JobStatus, PollBudget};
