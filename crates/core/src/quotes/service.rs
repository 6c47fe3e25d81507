//! Quote propagation: one FSS quote to a CRM contact and, optionally, an
//! opportunity

use std::sync::Arc;
use std::time::Duration;

use fieldbridge_domain::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use fieldbridge_domain::{
    ExternalSystem, FieldBridgeError, IntegrationConfig, QuoteSyncRecord, QuoteSyncResult, Result,
};
use tracing::{debug, info, instrument, warn};

use super::mapping::{contact_fields, fingerprint, opportunity_fields};
use super::ports::QuoteSyncStore;
use crate::clock::{Clock, SystemClock};
use crate::gateway_ports::{CrmContactGateway, QuoteSource};
use crate::remote::call_remote;

#[derive(Clone)]
pub struct QuoteSyncService {
    quotes: Arc<dyn QuoteSource>,
    contacts: Arc<dyn CrmContactGateway>,
    records: Arc<dyn QuoteSyncStore>,
    clock: Arc<dyn Clock>,
    request_timeout: Duration,
}

impl QuoteSyncService {
    pub fn new(
        quotes: Arc<dyn QuoteSource>,
        contacts: Arc<dyn CrmContactGateway>,
        records: Arc<dyn QuoteSyncStore>,
    ) -> Self {
        Self {
            quotes,
            contacts,
            records,
            clock: Arc::new(SystemClock),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sync one quote. Failures are reported in the result, never returned.
    #[instrument(skip(self, config), fields(location_id = %location_id, quote_id = %quote_id))]
    pub async fn sync_quote(
        &self,
        location_id: &str,
        quote_id: &str,
        config: &IntegrationConfig,
    ) -> QuoteSyncResult {
        match self.try_sync_quote(location_id, quote_id, config).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, kind = %err.kind(), "quote sync failed");
                QuoteSyncResult::failed(quote_id, &err)
            }
        }
    }

    async fn try_sync_quote(
        &self,
        location_id: &str,
        quote_id: &str,
        config: &IntegrationConfig,
    ) -> Result<QuoteSyncResult> {
        if location_id.trim().is_empty() || quote_id.trim().is_empty() {
            return Err(FieldBridgeError::InvalidInput("location id and quote id are required".into()));
        }

        let quote = call_remote(
            ExternalSystem::Fss,
            "get_quote",
            self.request_timeout,
            self.quotes.get_quote(location_id, quote_id),
        )
        .await?
        .ok_or_else(|| FieldBridgeError::NotFound(format!("quote {quote_id}")))?;

        let contact = contact_fields(&quote, config);
        let opportunity = opportunity_fields(&quote, config);
        let payload_fingerprint = fingerprint(&contact, opportunity.as_ref())?;

        let existing = self.records.get_quote_record(location_id, quote_id).await?;
        if let Some(record) = existing.as_ref().filter(|r| r.payload_fingerprint == payload_fingerprint) {
            debug!("quote unchanged since last sync");
            return Ok(QuoteSyncResult::unchanged(record));
        }

        if !contact.has_identity() {
            return Err(FieldBridgeError::InvalidInput(format!(
                "quote {quote_id} has no customer email or phone"
            )));
        }

        let contact_id = call_remote(
            ExternalSystem::Crm,
            "upsert_contact",
            self.request_timeout,
            self.contacts.upsert_contact(location_id, &contact),
        )
        .await?;

        let previous_opportunity = existing.as_ref().and_then(|r| r.crm_opportunity_id.clone());
        let opportunity_id = match &opportunity {
            Some(fields) => Some(
                call_remote(
                    ExternalSystem::Crm,
                    "upsert_opportunity",
                    self.request_timeout,
                    self.contacts.upsert_opportunity(
                        location_id,
                        &contact_id,
                        previous_opportunity.as_deref(),
                        fields,
                    ),
                )
                .await?,
            ),
            None => previous_opportunity,
        };

        let record = QuoteSyncRecord {
            location_id: location_id.to_string(),
            fss_quote_id: quote_id.to_string(),
            crm_contact_id: contact_id,
            crm_opportunity_id: opportunity_id,
            payload_fingerprint,
            last_synced_at: self.clock.now(),
        };
        self.records.upsert_quote_record(&record).await?;

        info!(
            contact_id = %record.crm_contact_id,
            opportunity_id = ?record.crm_opportunity_id,
            "quote synced"
        );
        Ok(QuoteSyncResult::synced(&record))
    }
}
