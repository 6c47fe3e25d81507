//! FSS quote to CRM contact/opportunity field mapping
//!
//! Basic customer fields map one-to-one. Every other scalar on the quote is
//! carried as a CRM custom field named `<prefix><key>`.

use std::collections::{BTreeMap, BTreeSet};

use fieldbridge_domain::{
    ContactFields, FieldBridgeError, IntegrationConfig, OpportunityFields, Quote, Result,
};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Opportunity status for a quote that has just been sent to the customer.
pub const OPPORTUNITY_STATUS_OPEN: &str = "open";

/// Contact payload for `quote` under the location's settings.
pub fn contact_fields(quote: &Quote, config: &IntegrationConfig) -> ContactFields {
    let customer = &quote.customer;
    let prefix = config.custom_field_prefix.as_str();

    let mut custom_fields = BTreeMap::new();
    let mut put = |key: &str, value: Value| {
        custom_fields.insert(format!("{prefix}{}", field_key(key)), value);
    };

    put("quote_id", Value::String(quote.id.clone()));
    if let Some(number) = &quote.number {
        put("quote_number", Value::String(number.clone()));
    }
    if let Some(title) = &quote.title {
        put("quote_title", Value::String(title.clone()));
    }
    if let Some(status) = &quote.status {
        put("quote_status", Value::String(status.clone()));
    }
    if let Some(total) = quote.total.and_then(serde_json::Number::from_f64) {
        put("quote_total", Value::Number(total));
    }
    if let Some(currency) = &quote.currency {
        put("quote_currency", Value::String(currency.clone()));
    }
    for (key, value) in &quote.extra {
        if is_scalar(value) {
            put(key, value.clone());
        }
    }

    ContactFields {
        first_name: non_empty(customer.first_name.as_deref()),
        last_name: non_empty(customer.last_name.as_deref()),
        email: non_empty(customer.email.as_deref()).map(|e| e.to_lowercase()),
        phone: non_empty(customer.phone.as_deref()),
        address1: non_empty(customer.address.as_deref()),
        city: non_empty(customer.city.as_deref()),
        postal_code: non_empty(customer.postal_code.as_deref()),
        company_name: non_empty(customer.company.as_deref()),
        tags: normalize_tags(&config.quote_tags),
        custom_fields,
    }
}

/// Opportunity payload, or `None` when the location does not create
/// opportunities.
pub fn opportunity_fields(quote: &Quote, config: &IntegrationConfig) -> Option<OpportunityFields> {
    if !config.create_opportunities {
        return None;
    }
    let reference = quote.reference();
    let name = non_empty(quote.title.as_deref()).unwrap_or_else(|| format!("Quote {reference}"));

    Some(OpportunityFields {
        name,
        monetary_value: quote.total,
        pipeline_id: config.opportunity_pipeline_id.clone(),
        stage_id: config.opportunity_stage_id.clone(),
        status: OPPORTUNITY_STATUS_OPEN.to_string(),
        reference,
    })
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    contact: &'a ContactFields,
    opportunity: Option<&'a OpportunityFields>,
}

/// SHA-256 over the canonical JSON of everything that would be written.
/// Map keys are ordered, so equal payloads hash equally.
pub fn fingerprint(contact: &ContactFields, opportunity: Option<&OpportunityFields>) -> Result<String> {
    let canonical = serde_json::to_vec(&FingerprintInput { contact, opportunity })
        .map_err(|e| FieldBridgeError::Internal(format!("fingerprint: {e}")))?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

fn is_scalar(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.trim().is_empty(),
        Value::Number(_) | Value::Bool(_) => true,
        _ => false,
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// `Job Site` -> `job_site`
fn field_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        if c.is_ascii_alphanumeric() {
            key.push(c.to_ascii_lowercase());
        } else if !key.ends_with('_') {
            key.push('_');
        }
    }
    key.trim_matches('_').to_string()
}

fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .map(str::to_string)
        .collect()
}
