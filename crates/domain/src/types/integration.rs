//! Per-location integration settings consumed by the engines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_APPOINTMENT_SYNC_INTERVAL_MINUTES, DEFAULT_CUSTOM_FIELD_PREFIX,
    DEFAULT_QUOTE_POLLING_INTERVAL_MINUTES, MS_PER_MINUTE,
};
use crate::types::ConflictPolicy;

/// Integration settings for one location.
///
/// `last_quote_poll_at` is epoch milliseconds and is only ever advanced
/// through the store's conditional claim, never cached in process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    pub location_id: String,
    pub enabled: bool,

    pub sync_appointments: bool,
    pub appointment_sync_interval_minutes: u32,
    pub appointment_conflict_resolution: ConflictPolicy,
    /// Location-wide CRM calendar, scanned alongside the mapped calendars.
    pub default_crm_calendar_id: Option<String>,
    pub default_buffer_minutes: u32,

    pub quote_polling_enabled: bool,
    pub quote_polling_interval_minutes: u32,
    pub last_quote_poll_at: Option<i64>,
    pub quote_discovery_cursor: Option<String>,
    pub sync_quotes: bool,
    pub create_opportunities: bool,
    pub opportunity_pipeline_id: Option<String>,
    pub opportunity_stage_id: Option<String>,
    pub quote_tags: Vec<String>,
    pub custom_field_prefix: String,

    pub updated_at: DateTime<Utc>,
}

impl IntegrationConfig {
    /// Disabled-by-default settings for a new location.
    pub fn new(location_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            location_id: location_id.into(),
            enabled: false,
            sync_appointments: false,
            appointment_sync_interval_minutes: DEFAULT_APPOINTMENT_SYNC_INTERVAL_MINUTES,
            appointment_conflict_resolution: ConflictPolicy::default(),
            default_crm_calendar_id: None,
            default_buffer_minutes: 0,
            quote_polling_enabled: false,
            quote_polling_interval_minutes: DEFAULT_QUOTE_POLLING_INTERVAL_MINUTES,
            last_quote_poll_at: None,
            quote_discovery_cursor: None,
            sync_quotes: false,
            create_opportunities: false,
            opportunity_pipeline_id: None,
            opportunity_stage_id: None,
            quote_tags: Vec::new(),
            custom_field_prefix: DEFAULT_CUSTOM_FIELD_PREFIX.to_string(),
            updated_at: now,
        }
    }

    pub fn wants_appointment_sync(&self) -> bool {
        self.enabled && self.sync_appointments
    }

    pub fn wants_quote_polling(&self) -> bool {
        self.enabled && self.quote_polling_enabled && self.sync_quotes
    }

    /// `last_quote_poll_at + interval`, or `0` for a location never polled.
    pub fn quote_poll_due_at(&self) -> i64 {
        match self.last_quote_poll_at {
            Some(last) => last.saturating_add(i64::from(self.quote_polling_interval_minutes) * MS_PER_MINUTE),
            None => 0,
        }
    }

    /// Milliseconds until the next poll is due, `None` when due now.
    pub fn quote_poll_remaining_ms(&self, now_ms: i64) -> Option<i64> {
        let due_at = self.quote_poll_due_at();
        (now_ms < due_at).then(|| due_at - now_ms)
    }
}
