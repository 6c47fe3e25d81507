//! Cross-system appointment correlation record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{FieldBridgeError, Result};
use crate::types::ExternalSystem;

/// Which system triggered the propagation that last touched a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    FssToCrm,
    CrmToFss,
    Bidirectional,
}

crate::impl_domain_status_conversions!(SyncDirection {
    FssToCrm => "fss_to_crm",
    CrmToFss => "crm_to_fss",
    Bidirectional => "bidirectional",
});

impl SyncDirection {
    pub fn from_source(source: ExternalSystem) -> Self {
        match source {
            ExternalSystem::Fss => Self::FssToCrm,
            ExternalSystem::Crm => Self::CrmToFss,
        }
    }
}

/// Rule used when both sides changed the same appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    FssWins,
    CrmWins,
    #[default]
    Timestamp,
}

crate::impl_domain_status_conversions!(ConflictPolicy {
    FssWins => "fss_wins",
    CrmWins => "crm_wins",
    Timestamp => "timestamp",
});

/// Explicit per-record reconciliation state.
///
/// `Unsynced` only exists in memory before the first side is recorded;
/// persisted rows are always in one of the other four states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Unsynced,
    FssOnly,
    CrmOnly,
    Synced,
    ConflictPending,
}

crate::impl_domain_status_conversions!(SyncState {
    Unsynced => "unsynced",
    FssOnly => "fss_only",
    CrmOnly => "crm_only",
    Synced => "synced",
    ConflictPending => "conflict_pending",
});

impl SyncState {
    /// State implied by which ids are known.
    pub fn from_presence(has_fss: bool, has_crm: bool) -> Self {
        match (has_fss, has_crm) {
            (false, false) => Self::Unsynced,
            (true, false) => Self::FssOnly,
            (false, true) => Self::CrmOnly,
            (true, true) => Self::Synced,
        }
    }
}

/// Cancellation is a status, rows are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRecordStatus {
    #[default]
    Active,
    Cancelled,
}

crate::impl_domain_status_conversions!(SyncRecordStatus {
    Active => "active",
    Cancelled => "cancelled",
});

/// Correlates one logical appointment across the FSS and the CRM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentSyncRecord {
    pub id: Uuid,
    pub location_id: String,
    pub fss_appointment_id: Option<String>,
    pub crm_appointment_id: Option<String>,
    pub crm_calendar_id: String,
    pub fss_team_id: Option<String>,
    pub fss_last_modified: Option<DateTime<Utc>>,
    pub crm_last_modified: Option<DateTime<Utc>>,
    pub sync_direction: SyncDirection,
    pub conflict_resolution: ConflictPolicy,
    pub state: SyncState,
    pub status: SyncRecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentSyncRecord {
    /// Fresh, not-yet-persisted record with neither side attached.
    pub fn new(
        location_id: impl Into<String>,
        crm_calendar_id: impl Into<String>,
        sync_direction: SyncDirection,
        conflict_resolution: ConflictPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            location_id: location_id.into(),
            fss_appointment_id: None,
            crm_appointment_id: None,
            crm_calendar_id: crm_calendar_id.into(),
            fss_team_id: None,
            fss_last_modified: None,
            crm_last_modified: None,
            sync_direction,
            conflict_resolution,
            state: SyncState::Unsynced,
            status: SyncRecordStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach (or refresh) the FSS side.
    pub fn with_fss(mut self, appointment_id: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        self.fss_appointment_id = Some(appointment_id.into());
        self.fss_last_modified = Some(last_modified);
        self.refresh_state();
        self
    }

    /// Attach (or refresh) the CRM side.
    pub fn with_crm(mut self, appointment_id: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        self.crm_appointment_id = Some(appointment_id.into());
        self.crm_last_modified = Some(last_modified);
        self.refresh_state();
        self
    }

    /// Re-derive `state` from id presence. Leaves `ConflictPending` alone
    /// while both ids are present.
    pub fn refresh_state(&mut self) {
        let derived =
            SyncState::from_presence(self.fss_appointment_id.is_some(), self.crm_appointment_id.is_some());
        if !(self.state == SyncState::ConflictPending && derived == SyncState::Synced) {
            self.state = derived;
        }
    }

    pub fn id_for(&self, system: ExternalSystem) -> Option<&str> {
        match system {
            ExternalSystem::Fss => self.fss_appointment_id.as_deref(),
            ExternalSystem::Crm => self.crm_appointment_id.as_deref(),
        }
    }

    pub fn last_modified_for(&self, system: ExternalSystem) -> Option<DateTime<Utc>> {
        match system {
            ExternalSystem::Fss => self.fss_last_modified,
            ExternalSystem::Crm => self.crm_last_modified,
        }
    }

    /// True when `observed` is not newer than what was last recorded for
    /// `system`, i.e. re-propagating would be a no-op.
    pub fn is_unchanged(&self, system: ExternalSystem, observed: DateTime<Utc>) -> bool {
        self.last_modified_for(system).is_some_and(|stored| observed <= stored)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == SyncRecordStatus::Cancelled
    }

    /// Checks the persistence invariants: at least one non-empty id, and a
    /// state consistent with which ids are present.
    pub fn validate(&self) -> Result<()> {
        let fss = self.fss_appointment_id.as_deref();
        let crm = self.crm_appointment_id.as_deref();

        if fss.is_none() && crm.is_none() {
            return Err(FieldBridgeError::InvalidInput(
                "sync record needs an FSS or CRM appointment id".to_string(),
            ));
        }
        if fss.is_some_and(|id| id.trim().is_empty()) || crm.is_some_and(|id| id.trim().is_empty()) {
            return Err(FieldBridgeError::InvalidInput("appointment ids must not be empty".to_string()));
        }
        if self.location_id.trim().is_empty() {
            return Err(FieldBridgeError::InvalidInput("location id must not be empty".to_string()));
        }

        let consistent = match self.state {
            SyncState::Unsynced => false,
            SyncState::FssOnly => fss.is_some() && crm.is_none(),
            SyncState::CrmOnly => fss.is_none() && crm.is_some(),
            SyncState::Synced | SyncState::ConflictPending => fss.is_some() && crm.is_some(),
        };
        if !consistent {
            return Err(FieldBridgeError::InvalidInput(format!(
                "state {} does not match ids (fss: {}, crm: {})",
                self.state,
                fss.is_some(),
                crm.is_some()
            )));
        }
        Ok(())
    }
}
