//! CRM wire format
//!
//! The CRM speaks camelCase JSON and wraps single records in a typed
//! envelope (`{"appointment": {..}}`, `{"contact": {..}}`). Reads use the
//! ordered-fallback extractors with one priority list per field.

use chrono::{DateTime, SecondsFormat, Utc};
use fieldbridge_domain::utils::{first_string, first_timestamp, first_value};
use fieldbridge_domain::{
    Appointment, AppointmentDraft, AppointmentStatus, ContactFields, ExternalSystem,
    FieldBridgeError, OpportunityFields, Result,
};
use serde::Serialize;
use serde_json::Value;

pub(crate) const EVENT_LIST_PATHS: &[&str] = &["events", "appointments", "data"];
pub(crate) const EVENT_ENVELOPE_PATHS: &[&str] = &["appointment", "event", "data"];

pub(crate) const EVENT_ID_PATHS: &[&str] = &["id", "eventId", "appointmentId"];
pub(crate) const CALENDAR_ID_PATHS: &[&str] = &["calendarId", "calendar.id"];
pub(crate) const START_PATHS: &[&str] = &["startTime", "start", "startDate"];
pub(crate) const END_PATHS: &[&str] = &["endTime", "end", "endDate"];
pub(crate) const STATUS_PATHS: &[&str] = &["appointmentStatus", "status"];
pub(crate) const MODIFIED_PATHS: &[&str] = &["dateUpdated", "updatedAt", "dateAdded"];
pub(crate) const TITLE_PATHS: &[&str] = &["title", "name"];
pub(crate) const CONTACT_PATHS: &[&str] = &["contactId", "contact.id"];
pub(crate) const NOTES_PATHS: &[&str] = &["notes", "description"];

pub(crate) const CONTACT_ID_PATHS: &[&str] = &["contact.id", "id", "contactId"];
pub(crate) const OPPORTUNITY_ID_PATHS: &[&str] = &["opportunity.id", "id", "opportunityId"];

/// Body for appointment create/update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmAppointmentPayload {
    pub calendar_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub appointment_status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CrmAppointmentPayload {
    pub fn from_draft(calendar_id: &str, draft: &AppointmentDraft) -> Self {
        Self {
            calendar_id: calendar_id.to_string(),
            title: draft.title.clone(),
            start_time: rfc3339(draft.start),
            end_time: rfc3339(draft.end),
            appointment_status: crm_status(draft.status),
            contact_id: draft.contact_id.clone(),
            notes: draft.notes.clone(),
        }
    }
}

/// The CRM's own status vocabulary.
fn crm_status(status: AppointmentStatus) -> &'static str {
    match status {
        AppointmentStatus::Scheduled => "new",
        AppointmentStatus::Confirmed => "confirmed",
        AppointmentStatus::Completed => "showed",
        AppointmentStatus::NoShow => "noshow",
        AppointmentStatus::Cancelled => "cancelled",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldValue {
    pub key: String,
    pub field_value: Value,
}

/// Body for `contacts/upsert`; the CRM matches on email, then phone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmContactPayload {
    pub location_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<CustomFieldValue>,
}

impl CrmContactPayload {
    pub fn new(location_id: &str, fields: &ContactFields) -> Self {
        Self {
            location_id: location_id.to_string(),
            first_name: fields.first_name.clone(),
            last_name: fields.last_name.clone(),
            email: fields.email.clone(),
            phone: fields.phone.clone(),
            address1: fields.address1.clone(),
            city: fields.city.clone(),
            postal_code: fields.postal_code.clone(),
            company_name: fields.company_name.clone(),
            tags: fields.tags.clone(),
            custom_fields: fields
                .custom_fields
                .iter()
                .map(|(key, value)| CustomFieldValue { key: key.clone(), field_value: value.clone() })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmOpportunityPayload {
    pub location_id: String,
    pub contact_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monetary_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_stage_id: Option<String>,
    pub status: String,
}

impl CrmOpportunityPayload {
    pub fn new(location_id: &str, contact_id: &str, fields: &OpportunityFields) -> Self {
        Self {
            location_id: location_id.to_string(),
            contact_id: contact_id.to_string(),
            name: fields.name.clone(),
            monetary_value: fields.monetary_value,
            pipeline_id: fields.pipeline_id.clone(),
            pipeline_stage_id: fields.stage_id.clone(),
            status: fields.status.clone(),
        }
    }
}

pub(crate) fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn event_items(body: &Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items.clone(),
        other => first_value(other, EVENT_LIST_PATHS)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    }
}

pub(crate) fn event_envelope(body: &Value) -> &Value {
    first_value(body, EVENT_ENVELOPE_PATHS).filter(|v| v.is_object()).unwrap_or(body)
}

/// Normalise one CRM calendar event. `calendar_hint` fills in a missing
/// calendar id on calendar-scoped listings.
pub fn appointment_from_value(value: &Value, calendar_hint: Option<&str>) -> Result<Appointment> {
    let id = first_string(value, EVENT_ID_PATHS)
        .ok_or_else(|| FieldBridgeError::InvalidInput("CRM appointment without id".into()))?;
    let resource_id = first_string(value, CALENDAR_ID_PATHS)
        .or_else(|| calendar_hint.map(str::to_string))
        .ok_or_else(|| FieldBridgeError::InvalidInput(format!("CRM appointment {id} has no calendar")))?;
    let start = first_timestamp(value, START_PATHS)
        .ok_or_else(|| FieldBridgeError::InvalidInput(format!("CRM appointment {id} has no start")))?;
    let end = first_timestamp(value, END_PATHS)
        .ok_or_else(|| FieldBridgeError::InvalidInput(format!("CRM appointment {id} has no end")))?;
    let last_modified = first_timestamp(value, MODIFIED_PATHS).ok_or_else(|| {
        FieldBridgeError::InvalidInput(format!("CRM appointment {id} has no modification time"))
    })?;

    Ok(Appointment {
        status: first_string(value, STATUS_PATHS)
            .map_or(AppointmentStatus::Scheduled, |s| AppointmentStatus::from_external(&s)),
        title: first_string(value, TITLE_PATHS),
        contact_id: first_string(value, CONTACT_PATHS),
        notes: first_string(value, NOTES_PATHS),
        id,
        source: ExternalSystem::Crm,
        resource_id,
        start,
        end,
        last_modified,
    })
}
