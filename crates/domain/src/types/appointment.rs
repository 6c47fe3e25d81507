//! Normalised appointment shapes shared by both gateways

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{FieldBridgeError, Result};
use crate::types::ExternalSystem;

/// Half-open instant range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Rejects empty and inverted ranges with `InvalidTimeRange`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(FieldBridgeError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Reconciliation window `[now - lookback, now + lookahead)`. Day counts
    /// that leave the representable date range are a `Config` error.
    pub fn around(now: DateTime<Utc>, lookback_days: u32, lookahead_days: u32) -> Result<Self> {
        let start = now
            .checked_sub_signed(Duration::days(i64::from(lookback_days)))
            .ok_or_else(|| FieldBridgeError::Config(format!("lookback_days {lookback_days} is out of range")))?;
        let end = now
            .checked_add_signed(Duration::days(i64::from(lookahead_days)))
            .ok_or_else(|| FieldBridgeError::Config(format!("lookahead_days {lookahead_days} is out of range")))?;
        Self::new(start, end)
    }

    /// Window widened by `buffer_minutes` on both sides.
    pub fn expanded(&self, buffer_minutes: u32) -> Self {
        let buffer = Duration::minutes(i64::from(buffer_minutes));
        Self { start: self.start - buffer, end: self.end + buffer }
    }

    /// Strict overlap; windows that only touch at a boundary do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        other.start < self.end && other.end > self.start
    }

    pub fn contains(&self, other: &TimeWindow) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Appointment lifecycle as both systems understand it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    NoShow,
    Cancelled,
}

crate::impl_domain_status_conversions!(AppointmentStatus {
    Scheduled => "scheduled",
    Confirmed => "confirmed",
    Completed => "completed",
    NoShow => "no_show",
    Cancelled => "cancelled",
});

impl AppointmentStatus {
    /// Lenient mapping for the free-form status strings the platforms emit.
    /// Unknown values are treated as `Scheduled`.
    pub fn from_external(raw: &str) -> Self {
        match raw.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "cancelled" | "canceled" | "deleted" | "void" => Self::Cancelled,
            "confirmed" => Self::Confirmed,
            "completed" | "complete" | "done" | "showed" => Self::Completed,
            "no_show" | "noshow" | "missed" => Self::NoShow,
            _ => Self::Scheduled,
        }
    }

    pub fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// An appointment as read from either gateway.
///
/// `resource_id` is the FSS team id for FSS appointments and the CRM calendar
/// id for CRM appointments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub source: ExternalSystem,
    pub resource_id: String,
    pub title: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub last_modified: DateTime<Utc>,
    pub contact_id: Option<String>,
    pub notes: Option<String>,
}

impl Appointment {
    pub fn window(&self) -> TimeWindow {
        TimeWindow { start: self.start, end: self.end }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status.is_cancelled()
    }

    /// Fields carried to the other system on propagation.
    pub fn to_draft(&self) -> AppointmentDraft {
        AppointmentDraft {
            title: self.title.clone(),
            start: self.start,
            end: self.end,
            status: self.status,
            contact_id: self.contact_id.clone(),
            notes: self.notes.clone(),
        }
    }
}

/// Payload for `upsert_appointment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentDraft {
    pub title: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub contact_id: Option<String>,
    pub notes: Option<String>,
}

/// Identifier (and remote modification time) returned by a gateway write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertedRecord {
    pub id: String,
    pub last_modified: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, hour, minute, 0).unwrap()
    }

    #[test]
    fn window_rejects_inverted_and_empty_ranges() {
        assert!(matches!(
            TimeWindow::new(at(10, 0), at(9, 0)),
            Err(FieldBridgeError::InvalidTimeRange { .. })
        ));
        assert!(TimeWindow::new(at(10, 0), at(10, 0)).is_err());
        assert!(TimeWindow::new(at(9, 0), at(10, 0)).is_ok());
    }

    #[test]
    fn back_to_back_windows_do_not_overlap() {
        let morning = TimeWindow::new(at(9, 0), at(11, 0)).unwrap();
        let late = TimeWindow::new(at(11, 0), at(12, 0)).unwrap();
        assert!(!morning.overlaps(&late));
        assert!(!late.overlaps(&morning));
    }

    #[test]
    fn buffer_turns_touching_windows_into_overlap() {
        let morning = TimeWindow::new(at(9, 0), at(11, 0)).unwrap();
        let late = TimeWindow::new(at(11, 0), at(12, 0)).unwrap();
        assert!(late.expanded(15).overlaps(&morning));
        assert_eq!(late.expanded(15).duration(), Duration::minutes(90));
    }

    #[test]
    fn around_builds_reconciliation_window() {
        let window = TimeWindow::around(at(12, 0), 7, 30).unwrap();
        assert_eq!(window.duration(), Duration::days(37));
        assert!(TimeWindow::around(at(12, 0), 0, 0).is_err());
    }

    #[test]
    fn around_rejects_day_counts_past_the_calendar() {
        let err = TimeWindow::around(at(12, 0), 4_000_000_000, 30).unwrap_err();
        assert!(matches!(err, FieldBridgeError::Config(ref msg) if msg.contains("lookback_days")));

        let err = TimeWindow::around(at(12, 0), 7, u32::MAX).unwrap_err();
        assert!(matches!(err, FieldBridgeError::Config(ref msg) if msg.contains("lookahead_days")));
    }

    #[test]
    fn external_status_mapping() {
        assert_eq!(AppointmentStatus::from_external("Canceled"), AppointmentStatus::Cancelled);
        assert_eq!(AppointmentStatus::from_external("no-show"), AppointmentStatus::NoShow);
        assert_eq!(AppointmentStatus::from_external("showed"), AppointmentStatus::Completed);
        assert_eq!(AppointmentStatus::from_external("booked"), AppointmentStatus::Scheduled);
    }
}
