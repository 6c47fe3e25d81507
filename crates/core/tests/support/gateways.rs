//! In-memory gateway mocks

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldbridge_core::{AppointmentGateway, Clock, CrmContactGateway, QuoteQuery, QuoteSource};
use fieldbridge_domain::{
    Appointment, AppointmentDraft, ContactFields, ExternalSystem, FieldBridgeError,
    OpportunityFields, Quote, Result as DomainResult, TimeWindow, UpsertedRecord,
};

use super::clock::FixedClock;

/// One `upsert_appointment` call as seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    pub resource_id: String,
    pub existing_id: Option<String>,
    pub draft: AppointmentDraft,
}

/// Appointment gateway backed by a vector. Writes stamp `last_modified`
/// with the shared clock, like a real platform would.
pub struct MockAppointmentGateway {
    system: ExternalSystem,
    clock: Arc<FixedClock>,
    appointments: Mutex<Vec<Appointment>>,
    writes: Mutex<Vec<RecordedWrite>>,
    failing_resources: Mutex<HashSet<String>>,
    failing_titles: Mutex<HashSet<String>>,
    write_delay: Mutex<Option<Duration>>,
    next_id: AtomicUsize,
}

impl MockAppointmentGateway {
    pub fn new(system: ExternalSystem, clock: Arc<FixedClock>) -> Self {
        Self {
            system,
            clock,
            appointments: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            failing_resources: Mutex::new(HashSet::new()),
            failing_titles: Mutex::new(HashSet::new()),
            write_delay: Mutex::new(None),
            next_id: AtomicUsize::new(1),
        }
    }

    pub fn with_appointment(self, appointment: Appointment) -> Self {
        self.appointments.lock().unwrap().push(appointment);
        self
    }

    /// Listing this team/calendar fails with a network error.
    pub fn fail_listing(&self, resource_id: &str) {
        self.failing_resources.lock().unwrap().insert(resource_id.to_string());
    }

    /// Writes whose draft carries this title fail with a network error.
    pub fn fail_writes_titled(&self, title: &str) {
        self.failing_titles.lock().unwrap().insert(title.to_string());
    }

    /// Writes sleep first, so concurrent callers interleave at the remote call.
    pub fn delay_writes(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = Some(delay);
    }

    pub fn clear_failures(&self) {
        self.failing_resources.lock().unwrap().clear();
        self.failing_titles.lock().unwrap().clear();
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn stored(&self, id: &str) -> Option<Appointment> {
        self.appointments.lock().unwrap().iter().find(|a| a.id == id).cloned()
    }

    pub fn all(&self) -> Vec<Appointment> {
        self.appointments.lock().unwrap().clone()
    }

    /// Simulate an edit made directly on the platform.
    pub fn edit(&self, id: &str, modified_at: DateTime<Utc>, change: impl FnOnce(&mut Appointment)) -> Appointment {
        let mut appointments = self.appointments.lock().unwrap();
        let appointment = appointments.iter_mut().find(|a| a.id == id).unwrap();
        change(appointment);
        appointment.last_modified = modified_at;
        appointment.clone()
    }
}

#[async_trait]
impl AppointmentGateway for MockAppointmentGateway {
    fn system(&self) -> ExternalSystem {
        self.system
    }

    async fn list_appointments(&self, resource_id: &str, window: &TimeWindow) -> DomainResult<Vec<Appointment>> {
        if self.failing_resources.lock().unwrap().contains(resource_id) {
            return Err(FieldBridgeError::Network(format!("listing {resource_id} failed")));
        }
        Ok(self
            .appointments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.resource_id == resource_id && a.window().overlaps(window))
            .cloned()
            .collect())
    }

    async fn get_appointment(&self, appointment_id: &str) -> DomainResult<Option<Appointment>> {
        Ok(self.stored(appointment_id))
    }

    async fn upsert_appointment(
        &self,
        resource_id: &str,
        existing_id: Option<&str>,
        draft: &AppointmentDraft,
    ) -> DomainResult<UpsertedRecord> {
        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let title = draft.title.clone().unwrap_or_default();
        if self.failing_titles.lock().unwrap().contains(&title) {
            return Err(FieldBridgeError::Network(format!("503 writing {title}")));
        }

        self.writes.lock().unwrap().push(RecordedWrite {
            resource_id: resource_id.to_string(),
            existing_id: existing_id.map(str::to_string),
            draft: draft.clone(),
        });

        let now = self.clock.now();
        let mut appointments = self.appointments.lock().unwrap();
        let id = match existing_id {
            Some(id) => {
                let existing = appointments
                    .iter_mut()
                    .find(|a| a.id == id)
                    .ok_or_else(|| FieldBridgeError::NotFound(format!("appointment {id}")))?;
                apply_draft(existing, resource_id, draft, now);
                id.to_string()
            }
            None => {
                let n = self.next_id.fetch_add(1, Ordering::SeqCst);
                let id = format!("{}-new-{n}", self.system);
                appointments.push(Appointment {
                    id: id.clone(),
                    source: self.system,
                    resource_id: resource_id.to_string(),
                    title: draft.title.clone(),
                    start: draft.start,
                    end: draft.end,
                    status: draft.status,
                    last_modified: now,
                    contact_id: draft.contact_id.clone(),
                    notes: draft.notes.clone(),
                });
                id
            }
        };

        Ok(UpsertedRecord { id, last_modified: now })
    }
}

fn apply_draft(target: &mut Appointment, resource_id: &str, draft: &AppointmentDraft, now: DateTime<Utc>) {
    target.resource_id = resource_id.to_string();
    target.title = draft.title.clone();
    target.start = draft.start;
    target.end = draft.end;
    target.status = draft.status;
    target.contact_id = draft.contact_id.clone();
    target.notes = draft.notes.clone();
    target.last_modified = now;
}

// ============================================================================
// Quotes
// ============================================================================

#[derive(Default)]
pub struct MockQuoteSource {
    quotes: Mutex<Vec<Quote>>,
    fail_listing: Mutex<bool>,
    queries: Mutex<Vec<QuoteQuery>>,
}

impl MockQuoteSource {
    pub fn new(quotes: Vec<Quote>) -> Self {
        Self { quotes: Mutex::new(quotes), ..Self::default() }
    }

    pub fn set_fail_listing(&self, fail: bool) {
        *self.fail_listing.lock().unwrap() = fail;
    }

    pub fn replace(&self, quote: Quote) {
        let mut quotes = self.quotes.lock().unwrap();
        quotes.retain(|q| q.id != quote.id);
        quotes.push(quote);
    }

    pub fn queries(&self) -> Vec<QuoteQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuoteSource for MockQuoteSource {
    async fn list_quotes(&self, _location_id: &str, query: &QuoteQuery) -> DomainResult<Vec<Quote>> {
        self.queries.lock().unwrap().push(query.clone());
        if *self.fail_listing.lock().unwrap() {
            return Err(FieldBridgeError::Network("quote listing unavailable".into()));
        }
        Ok(self.quotes.lock().unwrap().clone())
    }

    async fn get_quote(&self, _location_id: &str, quote_id: &str) -> DomainResult<Option<Quote>> {
        Ok(self.quotes.lock().unwrap().iter().find(|q| q.id == quote_id).cloned())
    }
}

/// Records contact and opportunity writes; ids are derived from the email.
#[derive(Default)]
pub struct MockCrmContacts {
    contacts: Mutex<Vec<ContactFields>>,
    opportunities: Mutex<Vec<(String, Option<String>, OpportunityFields)>>,
    failing_emails: Mutex<HashSet<String>>,
}

impl MockCrmContacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for_email(&self, email: &str) {
        self.failing_emails.lock().unwrap().insert(email.to_lowercase());
    }

    pub fn clear_failures(&self) {
        self.failing_emails.lock().unwrap().clear();
    }

    pub fn contact_writes(&self) -> Vec<ContactFields> {
        self.contacts.lock().unwrap().clone()
    }

    pub fn opportunity_writes(&self) -> Vec<(String, Option<String>, OpportunityFields)> {
        self.opportunities.lock().unwrap().clone()
    }
}

#[async_trait]
impl CrmContactGateway for MockCrmContacts {
    async fn upsert_contact(&self, _location_id: &str, fields: &ContactFields) -> DomainResult<String> {
        let email = fields.email.clone().unwrap_or_default();
        if self.failing_emails.lock().unwrap().contains(&email) {
            return Err(FieldBridgeError::Network(format!("contact upsert for {email} failed")));
        }
        self.contacts.lock().unwrap().push(fields.clone());
        Ok(format!("contact-{email}"))
    }

    async fn upsert_opportunity(
        &self,
        _location_id: &str,
        contact_id: &str,
        existing_id: Option<&str>,
        fields: &OpportunityFields,
    ) -> DomainResult<String> {
        self.opportunities.lock().unwrap().push((
            contact_id.to_string(),
            existing_id.map(str::to_string),
            fields.clone(),
        ));
        Ok(existing_id.map_or_else(|| format!("opp-{}", fields.reference), str::to_string))
    }
}
