//! Per-location integration settings

use std::time::Instant;

use chrono::Utc;
use fieldbridge_domain::{FieldBridgeError, IntegrationConfig, Result};

use crate::utils::logging::finish_command;
use crate::AppContext;

pub async fn get_integration_config(ctx: &AppContext, location_id: &str) -> Result<Option<IntegrationConfig>> {
    let command_name = "integrations::get_integration_config";
    let start = Instant::now();

    let result = ctx.configs.get_config(location_id).await;

    finish_command(command_name, start, result)
}

/// Store settings for a location and stamp `updated_at`. Quote poll
/// bookkeeping on an existing row is left as the store has it.
pub async fn save_integration_config(ctx: &AppContext, mut config: IntegrationConfig) -> Result<()> {
    let command_name = "integrations::save_integration_config";
    let start = Instant::now();

    let result = async {
        if config.location_id.trim().is_empty() {
            return Err(FieldBridgeError::InvalidInput("location_id must not be empty".into()));
        }
        config.updated_at = Utc::now();
        ctx.configs.save_config(&config).await
    }
    .await;

    finish_command(command_name, start, result)
}
