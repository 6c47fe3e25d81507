//! Command surface
//!
//! Every command takes the [`AppContext`](crate::AppContext), times itself
//! and logs `command_execution_success/failure` with a stable error label.
//! The route layer that receives HTTP calls, queue messages and webhooks
//! lives outside this workspace and calls these functions directly.

pub mod appointments;
pub mod availability;
pub mod integrations;
pub mod mappings;
pub mod quotes;
pub mod webhooks;

pub use appointments::{
    list_sync_records, sync_all, sync_all_locations, sync_crm_appointment, sync_fss_appointment,
};
pub use availability::{check_availability, check_team_availability, first_available_team};
pub use integrations::{get_integration_config, save_integration_config};
pub use mappings::{list_team_mappings, set_team_mapping_enabled, upsert_team_mapping};
pub use quotes::{poll_due_locations, sync_quote};
pub use webhooks::handle_crm_appointment_webhook;
