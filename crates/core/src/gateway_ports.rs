//! External gateway port interfaces
//!
//! Both platforms expose the same logical operations; authentication and
//! pagination are absorbed by the adapters in the infra crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldbridge_domain::{
    Appointment, AppointmentDraft, ContactFields, ExternalSystem, OpportunityFields, Quote, Result,
    TimeWindow, UpsertedRecord,
};

/// Appointment operations, implemented once per platform.
#[async_trait]
pub trait AppointmentGateway: Send + Sync {
    /// Which platform this gateway talks to
    fn system(&self) -> ExternalSystem;

    /// Appointments on a team (FSS) or calendar (CRM) intersecting `window`
    async fn list_appointments(
        &self,
        resource_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<Appointment>>;

    /// Fetch one appointment; `Ok(None)` when it does not exist
    async fn get_appointment(&self, appointment_id: &str) -> Result<Option<Appointment>>;

    /// Create (when `existing_id` is `None`) or update an appointment on
    /// `resource_id`
    async fn upsert_appointment(
        &self,
        resource_id: &str,
        existing_id: Option<&str>,
        draft: &AppointmentDraft,
    ) -> Result<UpsertedRecord>;
}

/// Filters for `list_quotes`. Adapters apply whichever the FSS supports and
/// callers re-filter the results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteQuery {
    pub since_id: Option<String>,
    pub modified_since: Option<DateTime<Utc>>,
    pub limit: u32,
}

/// Quote reads from the FSS
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn list_quotes(&self, location_id: &str, query: &QuoteQuery) -> Result<Vec<Quote>>;

    async fn get_quote(&self, location_id: &str, quote_id: &str) -> Result<Option<Quote>>;
}

/// Contact and opportunity writes on the CRM
#[async_trait]
pub trait CrmContactGateway: Send + Sync {
    /// Returns the contact id. The CRM matches existing contacts on email or
    /// phone.
    async fn upsert_contact(&self, location_id: &str, fields: &ContactFields) -> Result<String>;

    /// Returns the opportunity id
    async fn upsert_opportunity(
        &self,
        location_id: &str,
        contact_id: &str,
        existing_id: Option<&str>,
        fields: &OpportunityFields,
    ) -> Result<String>;
}
