//! Structured results returned to the route layer and schedulers

use serde::{Deserialize, Serialize};

use crate::errors::{FieldBridgeError, SyncErrorKind};
use crate::types::ExternalSystem;

/// What a single reconciliation step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Created,
    Updated,
    /// Neither side advanced since the stored timestamps.
    Unchanged,
    /// The resolver picked the other side; this pass discarded the change.
    SkippedConflict,
    /// Another pass holds the create claim for this appointment.
    InFlight,
    Failed,
}

crate::impl_domain_status_conversions!(SyncOutcome {
    Created => "created",
    Updated => "updated",
    Unchanged => "unchanged",
    SkippedConflict => "skipped_conflict",
    InFlight => "in_flight",
    Failed => "failed",
});

/// Per-appointment result inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSyncResult {
    pub source: ExternalSystem,
    pub appointment_id: String,
    pub counterpart_id: Option<String>,
    pub outcome: SyncOutcome,
    pub success: bool,
    pub error_kind: Option<SyncErrorKind>,
    pub error: Option<String>,
}

impl ItemSyncResult {
    pub fn ok(
        source: ExternalSystem,
        appointment_id: impl Into<String>,
        counterpart_id: Option<String>,
        outcome: SyncOutcome,
    ) -> Self {
        let error_kind =
            (outcome == SyncOutcome::SkippedConflict).then_some(SyncErrorKind::StaleConflictDiscarded);
        Self {
            source,
            appointment_id: appointment_id.into(),
            counterpart_id,
            outcome,
            success: true,
            error_kind,
            error: None,
        }
    }

    pub fn failed(source: ExternalSystem, appointment_id: impl Into<String>, err: &FieldBridgeError) -> Self {
        Self {
            source,
            appointment_id: appointment_id.into(),
            counterpart_id: None,
            outcome: SyncOutcome::Failed,
            success: false,
            error_kind: Some(err.kind()),
            error: Some(err.to_string()),
        }
    }

    /// Counted under `synced` in batch totals.
    pub fn wrote(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Created | SyncOutcome::Updated)
    }
}

/// Aggregate of one `sync_all` pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncAllReport {
    pub location_id: String,
    pub synced: usize,
    pub skipped: usize,
    pub errors: usize,
    pub results: Vec<ItemSyncResult>,
    /// Teams or calendars whose appointments could not be listed.
    pub listing_errors: Vec<String>,
}

impl SyncAllReport {
    pub fn new(location_id: impl Into<String>) -> Self {
        Self { location_id: location_id.into(), ..Self::default() }
    }

    pub fn record(&mut self, result: ItemSyncResult) {
        if !result.success {
            self.errors += 1;
        } else if result.wrote() {
            self.synced += 1;
        } else {
            self.skipped += 1;
        }
        self.results.push(result);
    }

    pub fn record_listing_error(&mut self, message: impl Into<String>) {
        self.errors += 1;
        self.listing_errors.push(message.into());
    }
}

/// Per-location result of `poll_due_locations`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationPollResult {
    pub location_id: String,
    pub skipped: bool,
    /// Milliseconds until the location is due, when skipped for throttling.
    pub remaining_ms: Option<i64>,
    pub quotes_synced: usize,
    pub errors: Vec<String>,
}

impl LocationPollResult {
    pub fn throttled(location_id: impl Into<String>, remaining_ms: i64) -> Self {
        Self {
            location_id: location_id.into(),
            skipped: true,
            remaining_ms: Some(remaining_ms),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_totals_follow_outcomes() {
        let mut report = SyncAllReport::new("loc-1");
        report.record(ItemSyncResult::ok(ExternalSystem::Fss, "a", Some("x".into()), SyncOutcome::Created));
        report.record(ItemSyncResult::ok(ExternalSystem::Fss, "b", None, SyncOutcome::Unchanged));
        report.record(ItemSyncResult::ok(ExternalSystem::Crm, "c", None, SyncOutcome::SkippedConflict));
        report.record(ItemSyncResult::failed(
            ExternalSystem::Crm,
            "d",
            &FieldBridgeError::remote_write(ExternalSystem::Fss, "502"),
        ));

        assert_eq!((report.synced, report.skipped, report.errors), (1, 2, 1));
        assert_eq!(report.results[2].error_kind, Some(SyncErrorKind::StaleConflictDiscarded));
        assert!(report.results[2].success);
        assert_eq!(report.results[3].error_kind, Some(SyncErrorKind::RemoteWriteFailed));
    }
}
