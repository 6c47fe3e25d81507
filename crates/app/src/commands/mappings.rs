//! Team/calendar mapping commands

use std::time::Instant;

use fieldbridge_domain::{Result, TeamCalendarMapping};

use crate::utils::logging::finish_command;
use crate::AppContext;

pub async fn upsert_team_mapping(ctx: &AppContext, mapping: &TeamCalendarMapping) -> Result<()> {
    let command_name = "mappings::upsert_team_mapping";
    let start = Instant::now();

    let result = ctx.mappings.upsert(mapping).await;

    finish_command(command_name, start, result)
}

pub async fn set_team_mapping_enabled(
    ctx: &AppContext,
    location_id: &str,
    fss_team_id: &str,
    enabled: bool,
) -> Result<()> {
    let command_name = "mappings::set_team_mapping_enabled";
    let start = Instant::now();

    let result = ctx.mappings.set_enabled(location_id, fss_team_id, enabled).await;

    finish_command(command_name, start, result)
}

pub async fn list_team_mappings(ctx: &AppContext, location_id: &str) -> Result<Vec<TeamCalendarMapping>> {
    let command_name = "mappings::list_team_mappings";
    let start = Instant::now();

    let result = ctx.mappings.list(location_id).await;

    finish_command(command_name, start, result)
}
