//! Error types used throughout the reconciliation engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ExternalSystem;

/// Main error type for FieldBridge
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum FieldBridgeError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Invalid time range: start {start} must be before end {end}")]
    InvalidTimeRange { start: DateTime<Utc>, end: DateTime<Utc> },

    /// `team_id` holds the calendar id when the trigger came from the CRM.
    #[error("No enabled team/calendar mapping for {team_id} at location {location_id}")]
    TeamMappingMissing { location_id: String, team_id: String },

    #[error("Remote write to {system} failed: {message}")]
    RemoteWriteFailed { system: ExternalSystem, message: String },

    #[error("Quote discovery unavailable: {0}")]
    DiscoveryUnavailable(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },
}

impl FieldBridgeError {
    pub fn remote_write(system: ExternalSystem, message: impl Into<String>) -> Self {
        Self::RemoteWriteFailed { system, message: message.into() }
    }

    pub fn team_mapping_missing(location_id: impl Into<String>, team_id: impl Into<String>) -> Self {
        Self::TeamMappingMissing { location_id: location_id.into(), team_id: team_id.into() }
    }

    /// Per-item label reported inside batch results.
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            Self::InvalidTimeRange { .. } | Self::InvalidInput(_) => SyncErrorKind::InvalidInput,
            Self::TeamMappingMissing { .. } => SyncErrorKind::TeamMappingMissing,
            Self::RemoteWriteFailed { .. } | Self::Network(_) | Self::Timeout { .. } => {
                SyncErrorKind::RemoteWriteFailed
            }
            Self::DiscoveryUnavailable(_) => SyncErrorKind::DiscoveryUnavailable,
            Self::NotFound(_) => SyncErrorKind::NotFound,
            Self::Config(_) | Self::Auth(_) => SyncErrorKind::Configuration,
            Self::Database(_) => SyncErrorKind::Storage,
            Self::Internal(_) => SyncErrorKind::Internal,
        }
    }
}

/// Stable, serialisable label for a per-item failure or informational outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncErrorKind {
    InvalidInput,
    TeamMappingMissing,
    RemoteWriteFailed,
    StaleConflictDiscarded,
    DiscoveryUnavailable,
    NotFound,
    Configuration,
    Storage,
    Internal,
}

impl SyncErrorKind {
    /// Only transient remote failures are picked up again, and only by the
    /// next scheduled pass.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RemoteWriteFailed)
    }

    /// `StaleConflictDiscarded` is an expected resolver outcome.
    pub fn is_error(self) -> bool {
        !matches!(self, Self::StaleConflictDiscarded)
    }
}

crate::impl_domain_status_conversions!(SyncErrorKind {
    InvalidInput => "invalid_input",
    TeamMappingMissing => "team_mapping_missing",
    RemoteWriteFailed => "remote_write_failed",
    StaleConflictDiscarded => "stale_conflict_discarded",
    DiscoveryUnavailable => "discovery_unavailable",
    NotFound => "not_found",
    Configuration => "configuration",
    Storage => "storage",
    Internal => "internal",
});

/// Result type alias for FieldBridge operations
pub type Result<T> = std::result::Result<T, FieldBridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_failures_are_the_only_retryable_kind() {
        let err = FieldBridgeError::remote_write(ExternalSystem::Crm, "503 Service Unavailable");
        assert_eq!(err.kind(), SyncErrorKind::RemoteWriteFailed);
        assert!(err.kind().is_retryable());

        let timeout = FieldBridgeError::Timeout { operation: "upsert".into(), seconds: 25 };
        assert_eq!(timeout.kind(), SyncErrorKind::RemoteWriteFailed);

        let missing = FieldBridgeError::team_mapping_missing("loc-1", "team-9");
        assert_eq!(missing.kind(), SyncErrorKind::TeamMappingMissing);
        assert!(!missing.kind().is_retryable());
    }

    #[test]
    fn stale_conflict_is_not_an_error() {
        assert!(!SyncErrorKind::StaleConflictDiscarded.is_error());
        assert!(SyncErrorKind::RemoteWriteFailed.is_error());
    }

    #[test]
    fn error_serializes_with_type_tag() {
        let err = FieldBridgeError::DiscoveryUnavailable("listing endpoint 404".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "DiscoveryUnavailable");
        assert_eq!(json["message"], "listing endpoint 404");
    }

    #[test]
    fn display_messages() {
        let err = FieldBridgeError::team_mapping_missing("loc-1", "team-9");
        assert_eq!(
            err.to_string(),
            "No enabled team/calendar mapping for team-9 at location loc-1"
        );
        let err = FieldBridgeError::remote_write(ExternalSystem::Fss, "timeout");
        assert_eq!(err.to_string(), "Remote write to fss failed: timeout");
    }

    #[test]
    fn error_kind_round_trips_through_string() {
        use std::str::FromStr;
        assert_eq!(
            SyncErrorKind::from_str("TEAM_MAPPING_MISSING").unwrap(),
            SyncErrorKind::TeamMappingMissing
        );
        assert_eq!(SyncErrorKind::RemoteWriteFailed.to_string(), "remote_write_failed");
    }
}
