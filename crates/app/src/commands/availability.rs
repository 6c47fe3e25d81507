//! Availability commands

use std::time::Instant;

use fieldbridge_domain::{AvailabilityRequest, AvailabilityResult, Result, TeamRef};
use tracing::debug;

use crate::utils::logging::finish_command;
use crate::AppContext;

pub async fn check_availability(ctx: &AppContext, request: &AvailabilityRequest) -> Result<AvailabilityResult> {
    let command_name = "availability::check_availability";
    let start = Instant::now();

    let result = ctx.availability.check_availability(request).await;
    if let Ok(availability) = &result {
        debug!(
            available = availability.available,
            teams = availability.available_teams.len(),
            conflicts = availability.conflicts.len(),
            "availability evaluated"
        );
    }

    finish_command(command_name, start, result)
}

pub async fn check_team_availability(
    ctx: &AppContext,
    team_id: &str,
    request: &AvailabilityRequest,
) -> Result<AvailabilityResult> {
    let command_name = "availability::check_team_availability";
    let start = Instant::now();

    let result = ctx.availability.check_team_availability(team_id, request).await;

    finish_command(command_name, start, result)
}

pub async fn first_available_team(ctx: &AppContext, request: &AvailabilityRequest) -> Result<Option<TeamRef>> {
    let command_name = "availability::first_available_team";
    let start = Instant::now();

    let result = ctx.availability.first_available_team(request).await;

    finish_command(command_name, start, result)
}
