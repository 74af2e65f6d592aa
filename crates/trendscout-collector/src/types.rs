use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trendscout_core::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Maps the status strings the collector API is known to return.
    pub(crate) fn from_remote(status: &str) -> Option<Self> {
        match status.trim().to_ascii_lowercase().as_str() {
            "queued" => Some(Self::Queued),
            "running" | "pending" | "building" | "collecting" => Some(Self::Running),
            "succeeded" | "success" | "ready" | "done" => Some(Self::Succeeded),
            "failed" | "error" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One remote collection run. Its status only changes through poll responses.
#[derive(Debug, Clone, Serialize)]
pub struct CollectorJob {
    pub snapshot_id: String,
    pub platform: Platform,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

/// How long [`crate::CollectorClient::poll`] may wait for a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollBudget {
    #[must_use]
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// Wall-clock ceiling for one poll: `max_attempts × interval`.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }

    #[must_use]
    pub fn interval_ms(&self) -> u64 {
        u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TriggerResponse {
    #[serde(alias = "snapshotId")]
    pub snapshot_id: String,
}

/// What one snapshot response says about the job.
#[derive(Debug, PartialEq)]
pub(crate) enum SnapshotState {
    Pending(JobStatus),
    Ready(Vec<Value>),
    Failed(String),
    Unrecognized(String),
}

impl SnapshotState {
    /// Interpret a snapshot body. A bare JSON array is a finished snapshot.
    pub(crate) fn from_body(body: Value) -> Self {
        let mut object = match body {
            Value::Array(items) => return Self::Ready(items),
            Value::Object(object) => object,
            other => return Self::Unrecognized(other.to_string()),
        };

        let raw_status = object
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match JobStatus::from_remote(&raw_status) {
            Some(JobStatus::Succeeded) => {
                let payload = object
                    .remove("results")
                    .or_else(|| object.remove("data"))
                    .unwrap_or(Value::Null);
                Self::Ready(match payload {
                    Value::Array(items) => items,
                    Value::Null => Vec::new(),
                    single => vec![single],
                })
            }
            Some(JobStatus::Failed) => {
                let reason = ["error", "message", "reason"]
                    .iter()
                    .find_map(|key| object.get(*key).and_then(Value::as_str))
                    .unwrap_or("remote job reported failure")
                    .to_string();
                Self::Failed(reason)
            }
            Some(status) => Self::Pending(status),
            None => Self::Unrecognized(raw_status),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn status_aliases_map_to_lifecycle() {
        assert_eq!(JobStatus::from_remote("success"), Some(JobStatus::Succeeded));
        assert_eq!(JobStatus::from_remote("READY"), Some(JobStatus::Succeeded));
        assert_eq!(JobStatus::from_remote("building"), Some(JobStatus::Running));
        assert_eq!(JobStatus::from_remote("error"), Some(JobStatus::Failed));
        assert_eq!(JobStatus::from_remote("queued"), Some(JobStatus::Queued));
        assert_eq!(JobStatus::from_remote("paused"), None);
    }

    #[test]
    fn only_succeeded_and_failed_are_terminal() {
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn budget_total_is_attempts_times_interval() {
        let budget = PollBudget::new(20, Duration::from_secs(3));
        assert_eq!(budget.total(), Duration::from_secs(60));
        assert_eq!(PollBudget::new(0, Duration::from_secs(1)).max_attempts, 1);
    }

    #[test]
    fn trigger_response_accepts_camel_case() {
        let parsed: TriggerResponse = serde_json::from_value(json!({"snapshotId": "s_1"})).unwrap();
        assert_eq!(parsed.snapshot_id, "s_1");
    }

    #[test]
    fn snapshot_results_are_extracted() {
        let state = SnapshotState::from_body(json!({
            "status": "success",
            "results": [{"likes": 1}, {"likes": 2}]
        }));
        assert_eq!(state, SnapshotState::Ready(vec![json!({"likes": 1}), json!({"likes": 2})]));
    }

    #[test]
    fn snapshot_data_field_is_accepted() {
        let state = SnapshotState::from_body(json!({"status": "ready", "data": [{"a": 1}]}));
        assert_eq!(state, SnapshotState::Ready(vec![json!({"a": 1})]));
    }

    #[test]
    fn bare_array_is_ready() {
        let state = SnapshotState::from_body(json!([{"a": 1}]));
        assert_eq!(state, SnapshotState::Ready(vec![json!({"a": 1})]));
    }

    #[test]
    fn failure_reason_is_carried() {
        let state = SnapshotState::from_body(json!({"status": "failed", "error": "blocked by target"}));
        assert_eq!(state, SnapshotState::Failed("blocked by target".to_string()));
    }

    #[test]
    fn unknown_status_is_unrecognized() {
        let state = SnapshotState::from_body(json!({"status": "paused"}));
        assert_eq!(state, SnapshotState::Unrecognized("paused".to_string()));
    }
}
