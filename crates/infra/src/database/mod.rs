//! Database implementations

mod columns;

pub mod appointment_sync_repository;
pub mod integration_config_repository;
pub mod manager;
pub mod quote_sync_repository;
pub mod team_mapping_repository;

pub use appointment_sync_repository::SqliteAppointmentSyncRepository;
pub use integration_config_repository::SqliteIntegrationConfigRepository;
pub use manager::DbManager;
pub use quote_sync_repository::SqliteQuoteSyncRepository;
pub use team_mapping_repository::SqliteTeamMappingRepository;
