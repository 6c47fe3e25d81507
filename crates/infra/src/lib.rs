//! # FieldBridge Infrastructure
//!
//! Implementations of the `fieldbridge-core` ports.
//!
//! This crate contains:
//! - SQLite stores for sync state, team mappings, quote records and
//!   per-location configuration
//! - REST adapters for the field-service system and the CRM, plus CRM
//!   webhook normalisation
//! - Cron schedulers for appointment sync and quote polling
//! - Configuration loading and log subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `fieldbridge-core`
//! - Depends on `fieldbridge-common` and `fieldbridge-domain`
//! - Contains all "impure" code (I/O, HTTP, timers)

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod observability;
pub mod scheduling;

pub use database::{
    DbManager, SqliteAppointmentSyncRepository, SqliteIntegrationConfigRepository,
    SqliteQuoteSyncRepository, SqliteTeamMappingRepository,
};
pub use errors::InfraError;
pub use http::HttpClient;
pub use integrations::crm::{parse_crm_appointment_webhook, webhook_location_id};
pub use integrations::{CrmClient, FssClient};
pub use observability::init_logging;
pub use scheduling::{AppointmentSyncScheduler, QuotePollScheduler};
