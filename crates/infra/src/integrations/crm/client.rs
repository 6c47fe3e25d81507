//! CRM REST adapter implementing the appointment and contact ports.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fieldbridge_core::{AppointmentGateway, CrmContactGateway};
use fieldbridge_domain::utils::{first_string, first_timestamp};
use fieldbridge_domain::{
    Appointment, AppointmentDraft, ContactFields, ExternalSystem, FieldBridgeError, GatewayConfig,
    OpportunityFields, Result, TimeWindow, UpsertedRecord,
};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::types::{
    appointment_from_value, event_envelope, event_items, CrmAppointmentPayload, CrmContactPayload,
    CrmOpportunityPayload, CONTACT_ID_PATHS, EVENT_ID_PATHS, MODIFIED_PATHS, OPPORTUNITY_ID_PATHS,
};
use crate::http::HttpClient;

const EVENTS: &[&str] = &["calendars", "events"];
const APPOINTMENTS: &[&str] = &["calendars", "events", "appointments"];

/// CRM API client
pub struct CrmClient {
    http: HttpClient,
}

impl CrmClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Build from the `[crm]` configuration section.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(FieldBridgeError::Config("crm.base_url is required".into()));
        }
        let http = HttpClient::builder(&config.base_url)
            .timeout(Duration::from_secs(config.timeout_secs))
            .max_attempts(config.max_attempts as usize)
            .bearer_token(config.api_key.clone())
            .build()?;
        Ok(Self::new(http))
    }

    fn write_failed(err: FieldBridgeError) -> FieldBridgeError {
        FieldBridgeError::remote_write(ExternalSystem::Crm, err.to_string())
    }
}

fn appointment_path(id: &str) -> Vec<&str> {
    let mut segments = APPOINTMENTS.to_vec();
    segments.push(id);
    segments
}

#[async_trait]
impl AppointmentGateway for CrmClient {
    fn system(&self) -> ExternalSystem {
        ExternalSystem::Crm
    }

    #[instrument(skip(self, window), fields(calendar_id = %calendar_id))]
    async fn list_appointments(&self, calendar_id: &str, window: &TimeWindow) -> Result<Vec<Appointment>> {
        let query = [
            ("calendarId", calendar_id.to_string()),
            ("startTime", window.start.timestamp_millis().to_string()),
            ("endTime", window.end.timestamp_millis().to_string()),
        ];
        let body: Value = self.http.get_json(EVENTS, &query).await?;

        let appointments: Vec<Appointment> = event_items(&body)
            .iter()
            .filter_map(|item| match appointment_from_value(item, Some(calendar_id)) {
                Ok(appointment) => Some(appointment),
                Err(err) => {
                    warn!(error = %err, "skipping malformed CRM event");
                    None
                }
            })
            .collect();

        debug!(count = appointments.len(), "listed CRM appointments");
        Ok(appointments)
    }

    async fn get_appointment(&self, appointment_id: &str) -> Result<Option<Appointment>> {
        let body: Option<Value> = self.http.get_json_optional(&appointment_path(appointment_id), &[]).await?;
        body.map(|body| appointment_from_value(event_envelope(&body), None)).transpose()
    }

    #[instrument(skip(self, draft), fields(calendar_id = %calendar_id, existing_id = ?existing_id))]
    async fn upsert_appointment(
        &self,
        calendar_id: &str,
        existing_id: Option<&str>,
        draft: &AppointmentDraft,
    ) -> Result<UpsertedRecord> {
        let payload = CrmAppointmentPayload::from_draft(calendar_id, draft);

        let body: Value = match existing_id {
            Some(id) => self.http.send_json::<_, Value>(Method::PUT, &appointment_path(id), &payload).await,
            None => self.http.send_json::<_, Value>(Method::POST, APPOINTMENTS, &payload).await,
        }
        .map_err(Self::write_failed)?;

        let event = event_envelope(&body);
        let id = first_string(event, EVENT_ID_PATHS)
            .or_else(|| existing_id.map(str::to_string))
            .ok_or_else(|| {
                FieldBridgeError::remote_write(ExternalSystem::Crm, "write response carried no appointment id")
            })?;
        let last_modified = first_timestamp(event, MODIFIED_PATHS).unwrap_or_else(Utc::now);

        Ok(UpsertedRecord { id, last_modified })
    }
}

#[async_trait]
impl CrmContactGateway for CrmClient {
    #[instrument(skip(self, fields), fields(location_id = %location_id))]
    async fn upsert_contact(&self, location_id: &str, fields: &ContactFields) -> Result<String> {
        let payload = CrmContactPayload::new(location_id, fields);
        let body: Value = self
            .http
            .send_json(Method::POST, &["contacts", "upsert"], &payload)
            .await
            .map_err(Self::write_failed)?;

        first_string(&body, CONTACT_ID_PATHS).ok_or_else(|| {
            FieldBridgeError::remote_write(ExternalSystem::Crm, "contact upsert returned no id")
        })
    }

    #[instrument(skip(self, fields), fields(location_id = %location_id, existing_id = ?existing_id))]
    async fn upsert_opportunity(
        &self,
        location_id: &str,
        contact_id: &str,
        existing_id: Option<&str>,
        fields: &OpportunityFields,
    ) -> Result<String> {
        let payload = CrmOpportunityPayload::new(location_id, contact_id, fields);
        let body: Value = match existing_id {
            Some(id) => self.http.send_json::<_, Value>(Method::PUT, &["opportunities", id], &payload).await,
            None => self.http.send_json::<_, Value>(Method::POST, &["opportunities"], &payload).await,
        }
        .map_err(Self::write_failed)?;

        first_string(&body, OPPORTUNITY_ID_PATHS)
            .or_else(|| existing_id.map(str::to_string))
            .ok_or_else(|| {
                FieldBridgeError::remote_write(ExternalSystem::Crm, "opportunity write returned no id")
            })
    }
}
