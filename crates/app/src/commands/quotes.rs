//! Quote commands

use std::time::Instant;

use fieldbridge_domain::{FieldBridgeError, LocationPollResult, QuoteSyncResult, Result};
use tracing::info;

use crate::utils::logging::finish_command;
use crate::AppContext;

/// Sync one quote on demand, e.g. from an FSS "quote updated" event.
///
/// The location must have an integration config; per-quote failures come
/// back inside the [`QuoteSyncResult`].
pub async fn sync_quote(ctx: &AppContext, location_id: &str, quote_id: &str) -> Result<QuoteSyncResult> {
    let command_name = "quotes::sync_quote";
    let start = Instant::now();

    let result = async {
        let config = ctx
            .configs
            .get_config(location_id)
            .await?
            .ok_or_else(|| FieldBridgeError::NotFound(format!("integration config {location_id}")))?;
        Ok(ctx.quote_sync.sync_quote(location_id, quote_id, &config).await)
    }
    .await;

    finish_command(command_name, start, result)
}

pub async fn poll_due_locations(ctx: &AppContext) -> Result<Vec<LocationPollResult>> {
    let command_name = "quotes::poll_due_locations";
    let start = Instant::now();

    let result = ctx.quote_poller.poll_due_locations().await;
    if let Ok(results) = &result {
        let polled = results.iter().filter(|r| !r.skipped).count();
        info!(locations = results.len(), polled, "quote poll trigger handled");
    }

    finish_command(command_name, start, result)
}
