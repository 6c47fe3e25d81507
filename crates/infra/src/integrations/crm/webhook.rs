//! Inbound CRM appointment webhooks
//!
//! The CRM delivers appointment changes in three shapes:
//!
//! - typed events: `{"type": "AppointmentUpdate", "locationId", "appointment": {..}}`
//! - workflow callbacks: `{"location": {"id"}, "calendar": {"id", "appointmentId", ..}}`,
//!   where `calendar.id` is the calendar and the event id sits beside it
//! - bare events, the same object the REST API returns
//!
//! Delivery is best effort and may be reordered; the sync engine gates on
//! `last_modified`, so a stale webhook is a no-op.

use fieldbridge_domain::utils::{first_string, first_timestamp};
use fieldbridge_domain::{Appointment, AppointmentStatus, ExternalSystem, FieldBridgeError, Result};
use serde_json::Value;

const EVENT_TYPE_PATHS: &[&str] = &["type", "event", "eventType"];
const LOCATION_PATHS: &[&str] = &["locationId", "location.id", "appointment.locationId", "location_id"];

const ID_PATHS: &[&str] = &["appointment.id", "calendar.appointmentId", "appointmentId", "id"];
const CALENDAR_PATHS: &[&str] =
    &["appointment.calendarId", "calendar.calendarId", "calendarId", "calendar.id"];
const START_PATHS: &[&str] = &["appointment.startTime", "calendar.startTime", "startTime"];
const END_PATHS: &[&str] = &["appointment.endTime", "calendar.endTime", "endTime"];
const STATUS_PATHS: &[&str] = &[
    "appointment.appointmentStatus",
    "calendar.appointmentStatus",
    "calendar.status",
    "appointmentStatus",
    "status",
];
/// The delivery timestamp is the last resort; it is never older than the
/// change it reports.
const MODIFIED_PATHS: &[&str] = &[
    "appointment.dateUpdated",
    "calendar.dateUpdated",
    "dateUpdated",
    "appointment.dateAdded",
    "calendar.dateAdded",
    "dateAdded",
    "timestamp",
];
const TITLE_PATHS: &[&str] = &["appointment.title", "calendar.title", "title"];
const CONTACT_PATHS: &[&str] = &["appointment.contactId", "contactId", "contact_id", "contact.id"];
const NOTES_PATHS: &[&str] = &["appointment.notes", "calendar.notes", "notes"];

const DELETE_EVENT_TYPES: &[&str] = &["AppointmentDelete", "appointment.deleted"];

/// Normalise a CRM appointment webhook body. Deletion events come back as a
/// cancelled appointment.
pub fn parse_crm_appointment_webhook(payload: &Value) -> Result<Appointment> {
    if !payload.is_object() {
        return Err(FieldBridgeError::InvalidInput("webhook body is not a JSON object".into()));
    }

    let id = first_string(payload, ID_PATHS)
        .ok_or_else(|| FieldBridgeError::InvalidInput("webhook carries no appointment id".into()))?;
    let missing = |field: &str| FieldBridgeError::InvalidInput(format!("webhook for {id} has no {field}"));

    let resource_id = first_string(payload, CALENDAR_PATHS).ok_or_else(|| missing("calendar"))?;
    let start = first_timestamp(payload, START_PATHS).ok_or_else(|| missing("start time"))?;
    let end = first_timestamp(payload, END_PATHS).ok_or_else(|| missing("end time"))?;
    let last_modified = first_timestamp(payload, MODIFIED_PATHS).ok_or_else(|| missing("modification time"))?;

    let deleted = first_string(payload, EVENT_TYPE_PATHS)
        .is_some_and(|kind| DELETE_EVENT_TYPES.iter().any(|d| d.eq_ignore_ascii_case(&kind)));
    let status = if deleted {
        AppointmentStatus::Cancelled
    } else {
        first_string(payload, STATUS_PATHS)
            .map_or(AppointmentStatus::Scheduled, |s| AppointmentStatus::from_external(&s))
    };

    Ok(Appointment {
        id,
        source: ExternalSystem::Crm,
        resource_id,
        title: first_string(payload, TITLE_PATHS),
        start,
        end,
        status,
        last_modified,
        contact_id: first_string(payload, CONTACT_PATHS),
        notes: first_string(payload, NOTES_PATHS),
    })
}

/// Location the webhook was emitted for, when the payload names one.
pub fn webhook_location_id(payload: &Value) -> Option<String> {
    first_string(payload, LOCATION_PATHS)
}
