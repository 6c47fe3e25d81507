//! Builders for domain values used across the integration tests

use chrono::{DateTime, TimeZone, Utc};
use fieldbridge_domain::{
    Appointment, AppointmentStatus, ConflictPolicy, ExternalSystem, IntegrationConfig, Quote,
    QuoteCustomer, TeamCalendarMapping,
};

pub const LOCATION: &str = "loc-1";

/// 2024-06-03 at `hour:minute` UTC
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, hour, minute, 0).unwrap()
}

pub fn appointment(
    source: ExternalSystem,
    id: &str,
    resource_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Appointment {
    Appointment {
        id: id.to_string(),
        source,
        resource_id: resource_id.to_string(),
        title: Some(format!("Job {id}")),
        start,
        end,
        status: AppointmentStatus::Scheduled,
        last_modified: at(6, 0),
        contact_id: None,
        notes: None,
    }
}

pub fn fss_appointment(id: &str, team_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Appointment {
    appointment(ExternalSystem::Fss, id, team_id, start, end)
}

pub fn crm_appointment(id: &str, calendar_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Appointment {
    appointment(ExternalSystem::Crm, id, calendar_id, start, end)
}

pub fn mapping(team_id: &str, calendar_id: &str) -> TeamCalendarMapping {
    TeamCalendarMapping::new(LOCATION, team_id, calendar_id, at(0, 0)).with_names(
        format!("Team {team_id}"),
        format!("Calendar {calendar_id}"),
    )
}

/// Enabled location with appointment sync and quote polling switched on.
pub fn integration_config(policy: ConflictPolicy) -> IntegrationConfig {
    let mut config = IntegrationConfig::new(LOCATION, at(0, 0));
    config.enabled = true;
    config.sync_appointments = true;
    config.appointment_conflict_resolution = policy;
    config.quote_polling_enabled = true;
    config.quote_polling_interval_minutes = 15;
    config.sync_quotes = true;
    config
}

pub fn quote(id: &str, email: &str) -> Quote {
    Quote {
        id: id.to_string(),
        number: Some(format!("Q-{id}")),
        title: Some(format!("Quote title {id}")),
        status: Some("sent".to_string()),
        total: Some(480.0),
        currency: Some("USD".to_string()),
        customer: QuoteCustomer {
            first_name: Some("Grace".to_string()),
            last_name: Some("Hopper".to_string()),
            email: Some(email.to_string()),
            ..QuoteCustomer::default()
        },
        created_at: Some(at(5, 0)),
        last_modified: Some(at(5, 30)),
        extra: serde_json::Map::new(),
    }
}
