//! Pure winner selection for two versions of the same logical appointment.
//!
//! Ties under the `timestamp` policy go to the CRM. The choice is arbitrary;
//! what matters is that every caller picks the same side for the same input.

use chrono::{DateTime, Utc};
use fieldbridge_domain::{Appointment, ConflictPolicy, ExternalSystem};

/// Winning side plus the version that should be applied to the other one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution<'a> {
    pub winner: ExternalSystem,
    pub record: &'a Appointment,
}

/// Pick between a live FSS and a live CRM version.
pub fn resolve<'a>(
    fss_version: &'a Appointment,
    crm_version: &'a Appointment,
    policy: ConflictPolicy,
) -> Resolution<'a> {
    let winner = resolve_timestamps(
        policy,
        Some(fss_version.last_modified),
        Some(crm_version.last_modified),
    );
    let record = match winner {
        ExternalSystem::Fss => fss_version,
        ExternalSystem::Crm => crm_version,
    };
    Resolution { winner, record }
}

/// Timestamp-level decision. A missing timestamp loses to any present one;
/// two missing timestamps are a tie.
pub fn resolve_timestamps(
    policy: ConflictPolicy,
    fss_last_modified: Option<DateTime<Utc>>,
    crm_last_modified: Option<DateTime<Utc>>,
) -> ExternalSystem {
    match policy {
        ConflictPolicy::FssWins => ExternalSystem::Fss,
        ConflictPolicy::CrmWins => ExternalSystem::Crm,
        ConflictPolicy::Timestamp => {
            // Option orders None below Some
            if fss_last_modified > crm_last_modified {
                ExternalSystem::Fss
            } else {
                ExternalSystem::Crm
            }
        }
    }
}
