//! CRM platform adapter: calendars, contacts and opportunities.

pub mod client;
pub mod types;
pub mod webhook;

pub use client::CrmClient;
pub use webhook::{parse_crm_appointment_webhook, webhook_location_id};
