//! In-memory store mocks
//!
//! The sync-record mock merges on either appointment id, the same way the
//! SQLite upsert does, so concurrency and idempotency tests exercise the
//! engine rather than the mock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldbridge_core::{
    AppointmentSyncStore, IntegrationConfigStore, QuoteSyncStore, TeamCalendarMappingStore,
};
use fieldbridge_domain::{
    AppointmentSyncRecord, IntegrationConfig, QuoteSyncRecord, Result as DomainResult,
    TeamCalendarMapping,
};

#[derive(Default)]
pub struct InMemorySyncStore {
    records: Mutex<Vec<AppointmentSyncRecord>>,
}

impl InMemorySyncStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AppointmentSyncRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

fn same_id(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

#[async_trait]
impl AppointmentSyncStore for InMemorySyncStore {
    async fn get_record(
        &self,
        fss_appointment_id: Option<&str>,
        crm_appointment_id: Option<&str>,
    ) -> DomainResult<Option<AppointmentSyncRecord>> {
        let records = self.records.lock().unwrap();
        let by_fss = fss_appointment_id.and_then(|id| {
            records.iter().find(|r| r.fss_appointment_id.as_deref() == Some(id))
        });
        let by_crm = || {
            crm_appointment_id.and_then(|id| {
                records.iter().find(|r| r.crm_appointment_id.as_deref() == Some(id))
            })
        };
        Ok(by_fss.or_else(by_crm).cloned())
    }

    async fn upsert_record(&self, record: &AppointmentSyncRecord) -> DomainResult<AppointmentSyncRecord> {
        record.validate()?;
        let mut records = self.records.lock().unwrap();
        let existing = records.iter_mut().find(|r| {
            same_id(&r.fss_appointment_id, &record.fss_appointment_id)
                || same_id(&r.crm_appointment_id, &record.crm_appointment_id)
        });

        match existing {
            Some(stored) => {
                let id = stored.id;
                let created_at = stored.created_at;
                *stored = AppointmentSyncRecord { id, created_at, ..record.clone() };
                Ok(stored.clone())
            }
            None => {
                records.push(record.clone());
                Ok(record.clone())
            }
        }
    }

    async fn claim_create(
        &self,
        record: &AppointmentSyncRecord,
        stale_before: DateTime<Utc>,
    ) -> DomainResult<Option<AppointmentSyncRecord>> {
        record.validate()?;
        let mut records = self.records.lock().unwrap();
        let existing = records.iter_mut().find(|r| {
            same_id(&r.fss_appointment_id, &record.fss_appointment_id)
                || same_id(&r.crm_appointment_id, &record.crm_appointment_id)
        });

        match existing {
            None => {
                records.push(record.clone());
                Ok(Some(record.clone()))
            }
            Some(stored) => {
                let linked = stored.fss_appointment_id.is_some() && stored.crm_appointment_id.is_some();
                if linked || stored.updated_at >= stale_before {
                    return Ok(None);
                }
                let id = stored.id;
                let created_at = stored.created_at;
                *stored = AppointmentSyncRecord { id, created_at, ..record.clone() };
                Ok(Some(stored.clone()))
            }
        }
    }

    async fn list_records_by_location(&self, location_id: &str) -> DomainResult<Vec<AppointmentSyncRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.location_id == location_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryMappingStore {
    mappings: Mutex<Vec<TeamCalendarMapping>>,
}

impl InMemoryMappingStore {
    pub fn new(mappings: Vec<TeamCalendarMapping>) -> Self {
        Self { mappings: Mutex::new(mappings) }
    }
}

#[async_trait]
impl TeamCalendarMappingStore for InMemoryMappingStore {
    async fn upsert_mapping(&self, mapping: &TeamCalendarMapping) -> DomainResult<()> {
        let mut mappings = self.mappings.lock().unwrap();
        match mappings
            .iter_mut()
            .find(|m| m.location_id == mapping.location_id && m.fss_team_id == mapping.fss_team_id)
        {
            Some(existing) => {
                let created_at = existing.created_at;
                *existing = TeamCalendarMapping { created_at, ..mapping.clone() };
            }
            None => mappings.push(mapping.clone()),
        }
        Ok(())
    }

    async fn get_mapping(&self, location_id: &str, fss_team_id: &str) -> DomainResult<Option<TeamCalendarMapping>> {
        Ok(self
            .mappings
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.location_id == location_id && m.fss_team_id == fss_team_id)
            .cloned())
    }

    async fn list_mappings(&self, location_id: &str) -> DomainResult<Vec<TeamCalendarMapping>> {
        Ok(self
            .mappings
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.location_id == location_id)
            .cloned()
            .collect())
    }

    async fn set_mapping_enabled(&self, location_id: &str, fss_team_id: &str, enabled: bool) -> DomainResult<bool> {
        let mut mappings = self.mappings.lock().unwrap();
        match mappings
            .iter_mut()
            .find(|m| m.location_id == location_id && m.fss_team_id == fss_team_id)
        {
            Some(mapping) => {
                mapping.enabled = enabled;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Config store with a real compare-and-set claim.
#[derive(Default)]
pub struct InMemoryConfigStore {
    configs: Mutex<Vec<IntegrationConfig>>,
    claims: AtomicUsize,
    completions: AtomicUsize,
}

impl InMemoryConfigStore {
    pub fn new(configs: Vec<IntegrationConfig>) -> Self {
        Self { configs: Mutex::new(configs), ..Self::default() }
    }

    pub fn config(&self, location_id: &str) -> Option<IntegrationConfig> {
        self.configs.lock().unwrap().iter().find(|c| c.location_id == location_id).cloned()
    }

    pub fn successful_claims(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntegrationConfigStore for InMemoryConfigStore {
    async fn get_config(&self, location_id: &str) -> DomainResult<Option<IntegrationConfig>> {
        Ok(self.config(location_id))
    }

    async fn list_configs(&self) -> DomainResult<Vec<IntegrationConfig>> {
        Ok(self.configs.lock().unwrap().clone())
    }

    async fn save_config(&self, config: &IntegrationConfig) -> DomainResult<()> {
        let mut configs = self.configs.lock().unwrap();
        configs.retain(|c| c.location_id != config.location_id);
        configs.push(config.clone());
        Ok(())
    }

    async fn claim_quote_poll(&self, location_id: &str, expected: Option<i64>, now_ms: i64) -> DomainResult<bool> {
        let mut configs = self.configs.lock().unwrap();
        let Some(config) = configs.iter_mut().find(|c| c.location_id == location_id) else {
            return Ok(false);
        };
        if config.last_quote_poll_at != expected {
            return Ok(false);
        }
        config.last_quote_poll_at = Some(now_ms);
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn complete_quote_poll(&self, location_id: &str, polled_at_ms: i64, cursor: Option<&str>) -> DomainResult<()> {
        let mut configs = self.configs.lock().unwrap();
        if let Some(config) = configs.iter_mut().find(|c| c.location_id == location_id) {
            config.last_quote_poll_at = Some(polled_at_ms);
            if let Some(cursor) = cursor {
                config.quote_discovery_cursor = Some(cursor.to_string());
            }
        }
        self.completions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQuoteStore {
    records: Mutex<HashMap<(String, String), QuoteSyncRecord>>,
}

impl InMemoryQuoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, location_id: &str, quote_id: &str) -> Option<QuoteSyncRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(location_id.to_string(), quote_id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl QuoteSyncStore for InMemoryQuoteStore {
    async fn get_quote_record(&self, location_id: &str, fss_quote_id: &str) -> DomainResult<Option<QuoteSyncRecord>> {
        Ok(self.record(location_id, fss_quote_id))
    }

    async fn upsert_quote_record(&self, record: &QuoteSyncRecord) -> DomainResult<()> {
        self.records
            .lock()
            .unwrap()
            .insert((record.location_id.clone(), record.fss_quote_id.clone()), record.clone());
        Ok(())
    }
}
