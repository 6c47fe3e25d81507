//! Appointment sync commands

use std::time::Instant;

use fieldbridge_domain::{Appointment, AppointmentSyncRecord, ItemSyncResult, Result, SyncAllReport};
use tracing::{info, warn};

use crate::utils::logging::finish_command;
use crate::AppContext;

/// Full bidirectional pass for one location.
pub async fn sync_all(ctx: &AppContext, location_id: &str) -> Result<SyncAllReport> {
    let command_name = "appointments::sync_all";
    let start = Instant::now();

    let result = ctx.engine.sync_all(location_id).await;

    finish_command(command_name, start, result)
}

/// One pass over every location with appointment sync turned on. A failing
/// location is logged and left out of the returned reports.
pub async fn sync_all_locations(ctx: &AppContext) -> Result<Vec<SyncAllReport>> {
    let command_name = "appointments::sync_all_locations";
    let start = Instant::now();

    let result = async {
        let mut reports = Vec::new();
        for config in ctx.configs.list_configs().await? {
            if !config.wants_appointment_sync() {
                continue;
            }
            match ctx.engine.sync_all(&config.location_id).await {
                Ok(report) => reports.push(report),
                Err(err) => warn!(location_id = %config.location_id, error = %err, "location sync failed"),
            }
        }
        info!(locations = reports.len(), "appointment sync finished for all locations");
        Ok(reports)
    }
    .await;

    finish_command(command_name, start, result)
}

/// Push one FSS appointment (usually from an FSS event) to the CRM.
pub async fn sync_fss_appointment(
    ctx: &AppContext,
    appointment: &Appointment,
    location_id: &str,
) -> Result<ItemSyncResult> {
    let command_name = "appointments::sync_fss_appointment";
    let start = Instant::now();

    let result = ctx.engine.sync_from_fss_to_crm(appointment, location_id).await;

    finish_command(command_name, start, result)
}

/// Push one CRM appointment to the FSS.
pub async fn sync_crm_appointment(
    ctx: &AppContext,
    appointment: &Appointment,
    location_id: &str,
) -> Result<ItemSyncResult> {
    let command_name = "appointments::sync_crm_appointment";
    let start = Instant::now();

    let result = ctx.engine.sync_from_crm_to_fss(appointment, location_id).await;

    finish_command(command_name, start, result)
}

pub async fn list_sync_records(ctx: &AppContext, location_id: &str) -> Result<Vec<AppointmentSyncRecord>> {
    let command_name = "appointments::list_sync_records";
    let start = Instant::now();

    let result = ctx.engine.list_sync_records(location_id).await;

    finish_command(command_name, start, result)
}
