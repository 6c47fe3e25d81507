//! FSS REST adapter implementing the appointment and quote ports.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fieldbridge_core::{AppointmentGateway, QuoteQuery, QuoteSource};
use fieldbridge_domain::utils::{first_string, first_timestamp};
use fieldbridge_domain::{
    Appointment, AppointmentDraft, ExternalSystem, FieldBridgeError, GatewayConfig, Quote, Result,
    TimeWindow, UpsertedRecord,
};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::types::{
    appointment_from_value, list_items, next_page, quote_from_value, rfc3339, single_item,
    FssAppointmentPayload, APPOINTMENT_ID_PATHS, MODIFIED_PATHS,
};
use crate::http::HttpClient;

/// Hard stop for runaway pagination.
const MAX_PAGES: u32 = 50;

/// FSS API client
pub struct FssClient {
    http: HttpClient,
    page_size: u32,
}

impl FssClient {
    pub fn new(http: HttpClient, page_size: u32) -> Self {
        Self { http, page_size: page_size.max(1) }
    }

    /// Build from the `[fss]` configuration section.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(FieldBridgeError::Config("fss.base_url is required".into()));
        }
        let http = HttpClient::builder(&config.base_url)
            .timeout(Duration::from_secs(config.timeout_secs))
            .max_attempts(config.max_attempts as usize)
            .bearer_token(config.api_key.clone())
            .build()?;
        Ok(Self::new(http, config.page_size))
    }
}

#[async_trait]
impl AppointmentGateway for FssClient {
    fn system(&self) -> ExternalSystem {
        ExternalSystem::Fss
    }

    #[instrument(skip(self, window), fields(team_id = %team_id))]
    async fn list_appointments(&self, team_id: &str, window: &TimeWindow) -> Result<Vec<Appointment>> {
        let mut appointments = Vec::new();
        let mut page: u32 = 1;

        loop {
            let query = [
                ("start", rfc3339(window.start)),
                ("end", rfc3339(window.end)),
                ("page", page.to_string()),
                ("per_page", self.page_size.to_string()),
            ];
            let body: Value = self.http.get_json(&["teams", team_id, "appointments"], &query).await?;

            let items = list_items(&body);
            let fetched = items.len();
            for item in &items {
                match appointment_from_value(item, Some(team_id)) {
                    Ok(appointment) => appointments.push(appointment),
                    Err(err) => warn!(error = %err, "skipping malformed FSS appointment"),
                }
            }

            match next_page(&body) {
                Some(next) if fetched > 0 && next > page && next <= MAX_PAGES => page = next,
                _ => break,
            }
        }

        debug!(count = appointments.len(), "listed FSS appointments");
        Ok(appointments)
    }

    async fn get_appointment(&self, appointment_id: &str) -> Result<Option<Appointment>> {
        let body: Option<Value> =
            self.http.get_json_optional(&["appointments", appointment_id], &[]).await?;
        body.map(|body| appointment_from_value(single_item(&body), None)).transpose()
    }

    #[instrument(skip(self, draft), fields(team_id = %team_id, existing_id = ?existing_id))]
    async fn upsert_appointment(
        &self,
        team_id: &str,
        existing_id: Option<&str>,
        draft: &AppointmentDraft,
    ) -> Result<UpsertedRecord> {
        let payload = FssAppointmentPayload::from_draft(team_id, draft);

        let body: Value = match existing_id {
            Some(id) => self.http.send_json::<_, Value>(Method::PUT, &["appointments", id], &payload).await,
            None => {
                self.http.send_json::<_, Value>(Method::POST, &["teams", team_id, "appointments"], &payload).await
            }
        }
        .map_err(|err| FieldBridgeError::remote_write(ExternalSystem::Fss, err.to_string()))?;

        let item = single_item(&body);
        let id = first_string(item, APPOINTMENT_ID_PATHS)
            .or_else(|| existing_id.map(str::to_string))
            .ok_or_else(|| {
                FieldBridgeError::remote_write(ExternalSystem::Fss, "write response carried no appointment id")
            })?;
        // without a platform stamp, the write time keeps the echo gate closed
        let last_modified = first_timestamp(item, MODIFIED_PATHS).unwrap_or_else(Utc::now);

        Ok(UpsertedRecord { id, last_modified })
    }
}

#[async_trait]
impl QuoteSource for FssClient {
    #[instrument(skip(self, query), fields(location_id = %location_id))]
    async fn list_quotes(&self, location_id: &str, query: &QuoteQuery) -> Result<Vec<Quote>> {
        let mut params = vec![("limit", query.limit.max(1).to_string())];
        if let Some(since_id) = &query.since_id {
            params.push(("since_id", since_id.clone()));
        }
        if let Some(since) = query.modified_since {
            params.push(("modified_since", rfc3339(since)));
        }

        let body: Value = self.http.get_json(&["locations", location_id, "quotes"], &params).await?;

        let quotes: Vec<Quote> = list_items(&body)
            .iter()
            .filter_map(|item| match quote_from_value(item) {
                Ok(quote) => Some(quote),
                Err(err) => {
                    warn!(error = %err, "skipping malformed FSS quote");
                    None
                }
            })
            .collect();

        debug!(count = quotes.len(), "listed FSS quotes");
        Ok(quotes)
    }

    async fn get_quote(&self, location_id: &str, quote_id: &str) -> Result<Option<Quote>> {
        let body: Option<Value> = self
            .http
            .get_json_optional(&["locations", location_id, "quotes", quote_id], &[])
            .await?;
        body.map(|body| quote_from_value(single_item(&body))).transpose()
    }
}
