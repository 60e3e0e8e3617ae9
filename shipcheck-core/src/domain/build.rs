//! Build domain model
//!
//! A build is owned by the cloud build service. Shipcheck only observes
//! builds: it never creates, mutates or deletes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single execution of a build trigger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    /// Build identifier assigned by the build service
    pub id: String,

    /// Current lifecycle status
    #[serde(default)]
    pub status: BuildStatus,

    /// Image references pushed by this build
    #[serde(default)]
    pub images: Vec<String>,

    /// Trigger that started the build, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_trigger_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<DateTime<Utc>>,

    /// Link to the build logs in the cloud console
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_url: Option<String>,
}

/// Build status as reported by the build API
///
/// Unrecognized values deserialize to [`BuildStatus::StatusUnknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    Pending,
    Queued,
    Working,
    Success,
    Failure,
    InternalError,
    Timeout,
    Cancelled,
    Expired,
    #[default]
    #[serde(other)]
    StatusUnknown,
}

/// How the poller reads a build status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    /// Waiting for a worker
    Queued,
    /// Executing
    Working,
    /// Finished successfully
    Succeeded,
    /// Any other value, terminal or not
    Other,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::StatusUnknown => "STATUS_UNKNOWN",
            BuildStatus::Pending => "PENDING",
            BuildStatus::Queued => "QUEUED",
            BuildStatus::Working => "WORKING",
            BuildStatus::Success => "SUCCESS",
            BuildStatus::Failure => "FAILURE",
            BuildStatus::InternalError => "INTERNAL_ERROR",
            BuildStatus::Timeout => "TIMEOUT",
            BuildStatus::Cancelled => "CANCELLED",
            BuildStatus::Expired => "EXPIRED",
        }
    }

    pub fn phase(&self) -> BuildPhase {
        match self {
            BuildStatus::Queued => BuildPhase::Queued,
            BuildStatus::Working => BuildPhase::Working,
            BuildStatus::Success => BuildPhase::Succeeded,
            _ => BuildPhase::Other,
        }
    }

    /// Returns `true` once the build service will no longer change the status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BuildStatus::Success
                | BuildStatus::Failure
                | BuildStatus::InternalError
                | BuildStatus::Timeout
                | BuildStatus::Cancelled
                | BuildStatus::Expired
        )
    }

    /// Terminal and not successful
    pub fn is_failure(&self) -> bool {
        self.is_terminal() && *self != BuildStatus::Success
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_deserializes_api_payload() {
        let json = r#"{
            "id": "b-123",
            "status": "WORKING",
            "images": ["gcr.io/p/app:abc"],
            "buildTriggerId": "t-1",
            "createTime": "2024-05-01T10:00:00.123456Z",
            "logUrl": "https://console.cloud.google.com/cloud-build/builds/b-123"
        }"#;

        let build: Build = serde_json::from_str(json).unwrap();
        assert_eq!(build.id, "b-123");
        assert_eq!(build.status, BuildStatus::Working);
        assert_eq!(build.images, vec!["gcr.io/p/app:abc".to_string()]);
        assert_eq!(build.build_trigger_id.as_deref(), Some("t-1"));
        assert!(build.create_time.is_some());
        assert!(build.finish_time.is_none());
    }

    #[test]
    fn test_unknown_status_falls_back() {
        let build: Build = serde_json::from_str(r#"{"id": "b", "status": "ON_FIRE"}"#).unwrap();
        assert_eq!(build.status, BuildStatus::StatusUnknown);

        let build: Build = serde_json::from_str(r#"{"id": "b"}"#).unwrap();
        assert_eq!(build.status, BuildStatus::StatusUnknown);
        assert!(build.images.is_empty());

        let status: BuildStatus = serde_json::from_str(r#""STATUS_UNKNOWN""#).unwrap();
        assert_eq!(status, BuildStatus::StatusUnknown);
        assert_eq!(serde_json::to_string(&BuildStatus::InternalError).unwrap(), r#""INTERNAL_ERROR""#);
    }

    #[test]
    fn test_phase_classification() {
        assert_eq!(BuildStatus::Queued.phase(), BuildPhase::Queued);
        assert_eq!(BuildStatus::Working.phase(), BuildPhase::Working);
        assert_eq!(BuildStatus::Success.phase(), BuildPhase::Succeeded);
        assert_eq!(BuildStatus::Pending.phase(), BuildPhase::Other);
        assert_eq!(BuildStatus::Failure.phase(), BuildPhase::Other);
        assert_eq!(BuildStatus::StatusUnknown.phase(), BuildPhase::Other);
    }

    #[test]
    fn test_failure_statuses() {
        assert!(BuildStatus::Failure.is_failure());
        assert!(BuildStatus::Timeout.is_failure());
        assert!(BuildStatus::Cancelled.is_failure());
        assert!(!BuildStatus::Success.is_failure());
        assert!(!BuildStatus::Working.is_failure());
        assert!(!BuildStatus::Pending.is_failure());
        assert!(BuildStatus::Success.is_terminal());
    }
}
