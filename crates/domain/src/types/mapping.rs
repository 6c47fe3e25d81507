use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{FieldBridgeError, Result};

/// Per-location link between an FSS team and a CRM calendar, unique on
/// `(location_id, fss_team_id)`. Names are advisory copies for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamCalendarMapping {
    pub location_id: String,
    pub fss_team_id: String,
    pub fss_team_name: Option<String>,
    pub crm_calendar_id: String,
    pub crm_calendar_name: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamCalendarMapping {
    pub fn new(
        location_id: impl Into<String>,
        fss_team_id: impl Into<String>,
        crm_calendar_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            location_id: location_id.into(),
            fss_team_id: fss_team_id.into(),
            fss_team_name: None,
            crm_calendar_id: crm_calendar_id.into(),
            crm_calendar_name: None,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_names(mut self, team_name: impl Into<String>, calendar_name: impl Into<String>) -> Self {
        self.fss_team_name = Some(team_name.into());
        self.crm_calendar_name = Some(calendar_name.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("location_id", &self.location_id),
            ("fss_team_id", &self.fss_team_id),
            ("crm_calendar_id", &self.crm_calendar_id),
        ] {
            if value.trim().is_empty() {
                return Err(FieldBridgeError::InvalidInput(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}
