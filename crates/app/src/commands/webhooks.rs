//! Inbound CRM webhooks

use std::time::Instant;

use fieldbridge_domain::{FieldBridgeError, ItemSyncResult, Result};
use fieldbridge_infra::{parse_crm_appointment_webhook, webhook_location_id};
use serde_json::Value;
use tracing::debug;

use crate::utils::logging::finish_command;
use crate::AppContext;

/// Normalise a CRM appointment webhook and push it to the FSS.
///
/// `location_id` comes from the route when the caller knows it; otherwise
/// it is read from the payload. Out-of-order deliveries are harmless, the
/// engine gates on the appointment's last-modified time.
pub async fn handle_crm_appointment_webhook(
    ctx: &AppContext,
    payload: &Value,
    location_id: Option<&str>,
) -> Result<ItemSyncResult> {
    let command_name = "webhooks::handle_crm_appointment_webhook";
    let start = Instant::now();

    let result = async {
        let location_id = location_id
            .map(str::to_string)
            .or_else(|| webhook_location_id(payload))
            .ok_or_else(|| FieldBridgeError::InvalidInput("webhook carries no location id".into()))?;
        let appointment = parse_crm_appointment_webhook(payload)?;
        debug!(
            location_id = %location_id,
            appointment_id = %appointment.id,
            status = %appointment.status,
            "crm webhook normalised"
        );
        ctx.engine.sync_from_crm_to_fss(&appointment, &location_id).await
    }
    .await;

    finish_command(command_name, start, result)
}
