//! Port interfaces for sync state and per-location configuration

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldbridge_domain::{AppointmentSyncRecord, IntegrationConfig, Result};

/// Durable correlation between FSS and CRM appointment ids.
#[async_trait]
pub trait AppointmentSyncStore: Send + Sync {
    /// Look up by whichever id is known. When both are given the FSS id is
    /// tried first.
    async fn get_record(
        &self,
        fss_appointment_id: Option<&str>,
        crm_appointment_id: Option<&str>,
    ) -> Result<Option<AppointmentSyncRecord>>;

    /// Atomic insert-or-update keyed on either appointment id. Concurrent
    /// upserts for the same logical appointment collapse into one row; the
    /// stored row is returned.
    async fn upsert_record(&self, record: &AppointmentSyncRecord) -> Result<AppointmentSyncRecord>;

    /// Conditional write of a half record ahead of creating its counterpart.
    ///
    /// Inserts when no row owns the record's appointment id, or takes over a
    /// half row whose `updated_at` is older than `stale_before`. Returns
    /// `None` when the row is already linked or another pass holds a live
    /// claim.
    async fn claim_create(
        &self,
        record: &AppointmentSyncRecord,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<AppointmentSyncRecord>>;

    async fn list_records_by_location(&self, location_id: &str) -> Result<Vec<AppointmentSyncRecord>>;
}

/// Per-location integration settings, including quote poll bookkeeping.
#[async_trait]
pub trait IntegrationConfigStore: Send + Sync {
    async fn get_config(&self, location_id: &str) -> Result<Option<IntegrationConfig>>;

    async fn list_configs(&self) -> Result<Vec<IntegrationConfig>>;

    async fn save_config(&self, config: &IntegrationConfig) -> Result<()>;

    /// Compare-and-set `last_quote_poll_at` from `expected` to `now_ms`.
    /// Returns `false` when another invocation claimed the poll first.
    async fn claim_quote_poll(
        &self,
        location_id: &str,
        expected: Option<i64>,
        now_ms: i64,
    ) -> Result<bool>;

    /// Unconditional completion write: stamps `last_quote_poll_at` and, when
    /// given, the discovery cursor.
    async fn complete_quote_poll(
        &self,
        location_id: &str,
        polled_at_ms: i64,
        cursor: Option<&str>,
    ) -> Result<()>;
}
