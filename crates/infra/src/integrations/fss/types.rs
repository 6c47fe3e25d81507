//! FSS wire format
//!
//! FSS responses differ between endpoints and API versions, so reads go
//! through `serde_json::Value` and the ordered-fallback extractors. Each
//! `*_PATHS` constant is the priority list for one field; the first path
//! yielding a usable value wins.

use chrono::{DateTime, SecondsFormat, Utc};
use fieldbridge_domain::utils::{first_f64, first_string, first_timestamp, first_value};
use fieldbridge_domain::{
    Appointment, AppointmentDraft, AppointmentStatus, ExternalSystem, FieldBridgeError, Quote,
    QuoteCustomer, Result,
};
use serde::Serialize;
use serde_json::{Map, Value};

// Envelopes
pub(crate) const LIST_ITEMS_PATHS: &[&str] = &["data", "items", "appointments", "quotes"];
pub(crate) const SINGLE_ITEM_PATHS: &[&str] = &["data", "appointment", "quote"];
pub(crate) const NEXT_PAGE_PATHS: &[&str] = &["meta.next_page", "pagination.next_page", "next_page"];

// Appointments
pub(crate) const APPOINTMENT_ID_PATHS: &[&str] = &["id", "appointment_id", "job.id"];
pub(crate) const TEAM_ID_PATHS: &[&str] = &["team_id", "team.id", "crew_id"];
pub(crate) const START_PATHS: &[&str] = &["start_time", "start", "scheduled_start"];
pub(crate) const END_PATHS: &[&str] = &["end_time", "end", "scheduled_end"];
pub(crate) const STATUS_PATHS: &[&str] = &["status", "state"];
pub(crate) const MODIFIED_PATHS: &[&str] = &["updated_at", "modified_at", "last_modified", "created_at"];
pub(crate) const TITLE_PATHS: &[&str] = &["title", "name", "job.title"];
pub(crate) const CUSTOMER_ID_PATHS: &[&str] = &["customer_id", "customer.id", "client_id"];
pub(crate) const NOTES_PATHS: &[&str] = &["notes", "description"];

// Quotes
pub(crate) const QUOTE_ID_PATHS: &[&str] = &["id", "quote_id"];
const QUOTE_NUMBER_PATHS: &[&str] = &["quote_number", "number", "reference"];
const QUOTE_TITLE_PATHS: &[&str] = &["title", "name", "subject"];
const QUOTE_TOTAL_PATHS: &[&str] = &["total", "total_amount", "grand_total", "amount"];
const QUOTE_CURRENCY_PATHS: &[&str] = &["currency", "currency_code"];
const QUOTE_CREATED_PATHS: &[&str] = &["created_at", "date_created"];
const QUOTE_MODIFIED_PATHS: &[&str] = &["updated_at", "modified_at", "last_modified"];

const CUSTOMER_FIRST_NAME_PATHS: &[&str] = &["customer.first_name", "client.first_name", "first_name"];
const CUSTOMER_LAST_NAME_PATHS: &[&str] = &["customer.last_name", "client.last_name", "last_name"];
const CUSTOMER_EMAIL_PATHS: &[&str] = &["customer.email", "client.email", "email"];
const CUSTOMER_PHONE_PATHS: &[&str] = &["customer.phone", "customer.mobile", "client.phone", "phone"];
const CUSTOMER_ADDRESS_PATHS: &[&str] = &["customer.address", "site.address", "address"];
const CUSTOMER_CITY_PATHS: &[&str] = &["customer.city", "site.city", "city"];
const CUSTOMER_POSTAL_PATHS: &[&str] = &["customer.postal_code", "site.postal_code", "postal_code"];
const CUSTOMER_COMPANY_PATHS: &[&str] = &["customer.company", "client.company", "company"];

/// Top-level quote keys consumed by the fixed mapping; everything else that
/// is a scalar is carried in `Quote::extra`.
const CONSUMED_QUOTE_KEYS: &[&str] = &[
    "id", "quote_id", "quote_number", "number", "reference", "title", "name", "subject", "status",
    "state", "total", "total_amount", "grand_total", "amount", "currency", "currency_code",
    "created_at", "date_created", "updated_at", "modified_at", "last_modified", "customer",
    "client", "site", "first_name", "last_name", "email", "phone", "address", "city",
    "postal_code", "company",
];

/// Body for appointment create/update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FssAppointmentPayload {
    pub team_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl FssAppointmentPayload {
    pub fn from_draft(team_id: &str, draft: &AppointmentDraft) -> Self {
        Self {
            team_id: team_id.to_string(),
            title: draft.title.clone(),
            start_time: rfc3339(draft.start),
            end_time: rfc3339(draft.end),
            status: draft.status.as_str(),
            customer_id: draft.contact_id.clone(),
            notes: draft.notes.clone(),
        }
    }
}

pub(crate) fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Items of a list response; a bare array is accepted too.
pub(crate) fn list_items(body: &Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items.clone(),
        other => first_value(other, LIST_ITEMS_PATHS)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    }
}

/// The object inside a single-item envelope, or the body itself.
pub(crate) fn single_item(body: &Value) -> &Value {
    first_value(body, SINGLE_ITEM_PATHS).filter(|v| v.is_object()).unwrap_or(body)
}

pub(crate) fn next_page(body: &Value) -> Option<u32> {
    first_value(body, NEXT_PAGE_PATHS)
        .and_then(Value::as_u64)
        .and_then(|page| u32::try_from(page).ok())
}

/// Normalise one FSS appointment. `team_hint` is used when the payload
/// does not name its team (team-scoped listings often omit it).
pub fn appointment_from_value(value: &Value, team_hint: Option<&str>) -> Result<Appointment> {
    let id = first_string(value, APPOINTMENT_ID_PATHS)
        .ok_or_else(|| FieldBridgeError::InvalidInput("FSS appointment without id".into()))?;
    let resource_id = first_string(value, TEAM_ID_PATHS)
        .or_else(|| team_hint.map(str::to_string))
        .ok_or_else(|| FieldBridgeError::InvalidInput(format!("FSS appointment {id} has no team")))?;
    let start = first_timestamp(value, START_PATHS)
        .ok_or_else(|| FieldBridgeError::InvalidInput(format!("FSS appointment {id} has no start")))?;
    let end = first_timestamp(value, END_PATHS)
        .ok_or_else(|| FieldBridgeError::InvalidInput(format!("FSS appointment {id} has no end")))?;
    let last_modified = first_timestamp(value, MODIFIED_PATHS).ok_or_else(|| {
        FieldBridgeError::InvalidInput(format!("FSS appointment {id} has no modification time"))
    })?;

    Ok(Appointment {
        status: first_string(value, STATUS_PATHS)
            .map_or(AppointmentStatus::Scheduled, |s| AppointmentStatus::from_external(&s)),
        title: first_string(value, TITLE_PATHS),
        contact_id: first_string(value, CUSTOMER_ID_PATHS),
        notes: first_string(value, NOTES_PATHS),
        id,
        source: ExternalSystem::Fss,
        resource_id,
        start,
        end,
        last_modified,
    })
}

/// Normalise one FSS quote.
pub fn quote_from_value(value: &Value) -> Result<Quote> {
    let id = first_string(value, QUOTE_ID_PATHS)
        .ok_or_else(|| FieldBridgeError::InvalidInput("FSS quote without id".into()))?;

    let customer = QuoteCustomer {
        first_name: first_string(value, CUSTOMER_FIRST_NAME_PATHS),
        last_name: first_string(value, CUSTOMER_LAST_NAME_PATHS),
        email: first_string(value, CUSTOMER_EMAIL_PATHS),
        phone: first_string(value, CUSTOMER_PHONE_PATHS),
        address: first_string(value, CUSTOMER_ADDRESS_PATHS),
        city: first_string(value, CUSTOMER_CITY_PATHS),
        postal_code: first_string(value, CUSTOMER_POSTAL_PATHS),
        company: first_string(value, CUSTOMER_COMPANY_PATHS),
    };

    let extra: Map<String, Value> = value
        .as_object()
        .map(|fields| {
            fields
                .iter()
                .filter(|(key, v)| {
                    !CONSUMED_QUOTE_KEYS.contains(&key.as_str()) && !v.is_object() && !v.is_array()
                })
                .map(|(key, v)| (key.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default();

    Ok(Quote {
        id,
        number: first_string(value, QUOTE_NUMBER_PATHS),
        title: first_string(value, QUOTE_TITLE_PATHS),
        status: first_string(value, STATUS_PATHS),
        total: first_f64(value, QUOTE_TOTAL_PATHS),
        currency: first_string(value, QUOTE_CURRENCY_PATHS),
        customer,
        created_at: first_timestamp(value, QUOTE_CREATED_PATHS),
        last_modified: first_timestamp(value, QUOTE_MODIFIED_PATHS),
        extra,
    })
}
