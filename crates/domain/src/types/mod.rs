//! Domain types and models
//!
//! Everything here is plain data: persisted records, transient results and
//! the normalised shapes both gateway adapters produce.

pub mod appointment;
pub mod availability;
pub mod integration;
pub mod mapping;
pub mod quote;
pub mod sync_record;
pub mod sync_result;
pub mod system;

pub use appointment::{Appointment, AppointmentDraft, AppointmentStatus, TimeWindow, UpsertedRecord};
pub use availability::{
    AvailabilityConflict, AvailabilityRequest, AvailabilityResult, CompetingAppointment,
    OverlapType, TeamRef,
};
pub use integration::IntegrationConfig;
pub use mapping::TeamCalendarMapping;
pub use quote::{
    ContactFields, OpportunityFields, Quote, QuoteCustomer, QuoteSyncRecord, QuoteSyncResult,
};
pub use sync_record::{
    AppointmentSyncRecord, ConflictPolicy, SyncDirection, SyncRecordStatus, SyncState,
};
pub use sync_result::{ItemSyncResult, LocationPollResult, SyncAllReport, SyncOutcome};
pub use system::ExternalSystem;
