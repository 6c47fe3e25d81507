//! Quote propagation types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{FieldBridgeError, SyncErrorKind};

/// Customer block of an FSS quote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteCustomer {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub company: Option<String>,
}

/// FSS quote, normalised by the FSS adapter. Fields the adapter has no
/// dedicated slot for are kept in `extra` so they can become CRM custom
/// fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
    pub number: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub total: Option<f64>,
    pub currency: Option<String>,
    pub customer: QuoteCustomer,
    pub created_at: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl Quote {
    /// Numeric id, when the FSS uses sequential identifiers.
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.trim().parse().ok()
    }

    /// Human reference used on the CRM opportunity.
    pub fn reference(&self) -> String {
        self.number.clone().unwrap_or_else(|| self.id.clone())
    }
}

/// Contact payload sent to the CRM.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address1: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub company_name: Option<String>,
    pub tags: Vec<String>,
    pub custom_fields: BTreeMap<String, Value>,
}

impl ContactFields {
    /// CRM contacts are matched on email or phone; without either the
    /// upsert would always create a new contact.
    pub fn has_identity(&self) -> bool {
        self.email.as_deref().is_some_and(|v| !v.trim().is_empty())
            || self.phone.as_deref().is_some_and(|v| !v.trim().is_empty())
    }
}

/// Opportunity payload sent to the CRM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityFields {
    pub name: String,
    pub monetary_value: Option<f64>,
    pub pipeline_id: Option<String>,
    pub stage_id: Option<String>,
    pub status: String,
    pub reference: String,
}

/// Idempotency guard for quote propagation, unique on
/// `(location_id, fss_quote_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSyncRecord {
    pub location_id: String,
    pub fss_quote_id: String,
    pub crm_contact_id: String,
    pub crm_opportunity_id: Option<String>,
    pub payload_fingerprint: String,
    pub last_synced_at: DateTime<Utc>,
}

/// Outcome of `sync_quote`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSyncResult {
    pub quote_id: String,
    pub success: bool,
    /// Already synced and unchanged; nothing was written.
    pub skipped: bool,
    pub contact_id: Option<String>,
    pub opportunity_id: Option<String>,
    pub error: Option<String>,
    pub error_kind: Option<SyncErrorKind>,
}

impl QuoteSyncResult {
    pub fn unchanged(record: &QuoteSyncRecord) -> Self {
        Self {
            quote_id: record.fss_quote_id.clone(),
            success: true,
            skipped: true,
            contact_id: Some(record.crm_contact_id.clone()),
            opportunity_id: record.crm_opportunity_id.clone(),
            error: None,
            error_kind: None,
        }
    }

    pub fn synced(record: &QuoteSyncRecord) -> Self {
        Self { skipped: false, ..Self::unchanged(record) }
    }

    pub fn failed(quote_id: impl Into<String>, err: &FieldBridgeError) -> Self {
        Self {
            quote_id: quote_id.into(),
            success: false,
            skipped: false,
            contact_id: None,
            opportunity_id: None,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
        }
    }
}
