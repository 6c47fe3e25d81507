//! Availability check inputs and results (transient, never persisted)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Appointment, TimeWindow};

/// How an existing appointment sits relative to the requested window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapType {
    /// Same start and end.
    Exact,
    /// Existing appointment covers the whole request.
    Contains,
    /// Existing appointment sits inside the request.
    Within,
    /// Existing appointment starts first and runs into the request.
    StartsBefore,
    /// Existing appointment starts inside the request and runs past it.
    EndsAfter,
    /// The team's appointments could not be fetched; treated as busy.
    FetchFailed,
}

crate::impl_domain_status_conversions!(OverlapType {
    Exact => "exact",
    Contains => "contains",
    Within => "within",
    StartsBefore => "starts_before",
    EndsAfter => "ends_after",
    FetchFailed => "fetch_failed",
});

impl OverlapType {
    /// `None` when the windows do not overlap.
    pub fn classify(existing: &TimeWindow, requested: &TimeWindow) -> Option<Self> {
        if !existing.overlaps(requested) {
            return None;
        }
        let kind = if existing == requested {
            Self::Exact
        } else if existing.contains(requested) {
            Self::Contains
        } else if requested.contains(existing) {
            Self::Within
        } else if existing.start < requested.start {
            Self::StartsBefore
        } else {
            Self::EndsAfter
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    pub team_id: String,
    pub team_name: Option<String>,
}

/// The appointment that blocks a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetingAppointment {
    pub id: String,
    pub title: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl From<&Appointment> for CompetingAppointment {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id.clone(),
            title: appointment.title.clone(),
            start: appointment.start,
            end: appointment.end,
        }
    }
}

/// One reason a team is unavailable. Fetch failures carry `error` and no
/// competing appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityConflict {
    pub team_id: String,
    pub team_name: Option<String>,
    pub competing_appointment: Option<CompetingAppointment>,
    pub overlap_type: OverlapType,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub location_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub exclude_appointment_ids: Vec<String>,
    #[serde(default)]
    pub buffer_minutes: u32,
}

impl AvailabilityRequest {
    pub fn new(location_id: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            location_id: location_id.into(),
            start,
            end,
            exclude_appointment_ids: Vec::new(),
            buffer_minutes: 0,
        }
    }

    pub fn excluding(mut self, appointment_id: impl Into<String>) -> Self {
        self.exclude_appointment_ids.push(appointment_id.into());
        self
    }

    pub fn with_buffer(mut self, buffer_minutes: u32) -> Self {
        self.buffer_minutes = buffer_minutes;
        self
    }
}

/// `available_teams` keeps mapping order; the first entry is the one
/// downstream booking picks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResult {
    pub available: bool,
    pub conflicts: Vec<AvailabilityConflict>,
    pub available_teams: Vec<TeamRef>,
}

impl AvailabilityResult {
    pub fn first_available_team(&self) -> Option<&TeamRef> {
        self.available_teams.first()
    }

    pub fn is_team_available(&self, team_id: &str) -> bool {
        self.available_teams.iter().any(|team| team.team_id == team_id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn window(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 5, 6, start_h, start_m, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 6, end_h, end_m, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn classify_every_overlap_shape() {
        let requested = window(10, 0, 11, 0);
        assert_eq!(OverlapType::classify(&window(10, 0, 11, 0), &requested), Some(OverlapType::Exact));
        assert_eq!(OverlapType::classify(&window(9, 0, 12, 0), &requested), Some(OverlapType::Contains));
        assert_eq!(OverlapType::classify(&window(10, 15, 10, 45), &requested), Some(OverlapType::Within));
        assert_eq!(
            OverlapType::classify(&window(9, 30, 10, 30), &requested),
            Some(OverlapType::StartsBefore)
        );
        assert_eq!(
            OverlapType::classify(&window(10, 30, 11, 30), &requested),
            Some(OverlapType::EndsAfter)
        );
    }

    #[test]
    fn touching_windows_are_not_classified() {
        let requested = window(11, 0, 12, 0);
        assert_eq!(OverlapType::classify(&window(9, 0, 11, 0), &requested), None);
        assert_eq!(OverlapType::classify(&window(12, 0, 13, 0), &requested), None);
    }

    #[test]
    fn first_available_team_keeps_order() {
        let result = AvailabilityResult {
            available: true,
            conflicts: Vec::new(),
            available_teams: vec![
                TeamRef { team_id: "t2".into(), team_name: None },
                TeamRef { team_id: "t1".into(), team_name: None },
            ],
        };
        assert_eq!(result.first_available_team().map(|t| t.team_id.as_str()), Some("t2"));
        assert!(result.is_team_available("t1"));
        assert!(!result.is_team_available("t3"));
    }
}
