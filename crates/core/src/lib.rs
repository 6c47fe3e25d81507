//! # FieldBridge Core
//!
//! Reconciliation logic between the field-service system and the CRM - no
//! infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for both gateways and every store
//! - Availability checking across interchangeable teams
//! - Conflict resolution and the appointment sync engine
//! - Quote discovery, mapping and propagation
//!
//! ## Architecture Principles
//! - Only depends on `fieldbridge-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Idempotency comes from the stores' constrained upserts, never from
//!   in-process locks

pub mod appointments;
pub mod availability;
pub mod clock;
pub mod conflict;
pub mod gateway_ports;
pub mod mapping;
pub mod quotes;
pub mod remote;

pub use appointments::ports::{AppointmentSyncStore, IntegrationConfigStore};
pub use appointments::{AppointmentSyncEngine, EngineSettings};
pub use availability::AvailabilityService;
pub use clock::{Clock, SystemClock};
pub use conflict::{resolve, resolve_timestamps, Resolution};
pub use gateway_ports::{AppointmentGateway, CrmContactGateway, QuoteQuery, QuoteSource};
pub use mapping::ports::TeamCalendarMappingStore;
pub use mapping::TeamCalendarMappingService;
pub use quotes::discovery::{
    DiscoveredQuotes, IdRangeDiscovery, QuoteDiscovery, RecentlyModifiedDiscovery,
};
pub use quotes::ports::QuoteSyncStore;
pub use quotes::{QuotePoller, QuoteSyncService};
