//! Availability checker
//!
//! For a requested window, every enabled team at the location is checked for
//! overlapping FSS appointments. A team whose appointments cannot be fetched
//! is reported as busy with a `FetchFailed` conflict; the call itself still
//! succeeds so callers can render partial availability.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use fieldbridge_domain::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use fieldbridge_domain::{
    AvailabilityConflict, AvailabilityRequest, AvailabilityResult, CompetingAppointment,
    FieldBridgeError, OverlapType, Result, TeamCalendarMapping, TeamRef, TimeWindow,
};
use futures::future::join_all;
use tracing::{debug, instrument, warn};

use crate::gateway_ports::AppointmentGateway;
use crate::mapping::TeamCalendarMappingService;
use crate::remote::call_remote;

pub struct AvailabilityService {
    mappings: TeamCalendarMappingService,
    fss: Arc<dyn AppointmentGateway>,
    request_timeout: Duration,
}

/// Outcome for one team.
struct TeamCheck {
    team: TeamRef,
    conflicts: Vec<AvailabilityConflict>,
}

impl AvailabilityService {
    pub fn new(mappings: TeamCalendarMappingService, fss: Arc<dyn AppointmentGateway>) -> Self {
        Self { mappings, fss, request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS) }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Check every enabled team at the request's location.
    #[instrument(skip(self, request), fields(location_id = %request.location_id, start = %request.start, end = %request.end))]
    pub async fn check_availability(&self, request: &AvailabilityRequest) -> Result<AvailabilityResult> {
        let window = TimeWindow::new(request.start, request.end)?;
        let teams = self.mappings.list_enabled(&request.location_id).await?;
        let checks = self.check_teams(&teams, &window, request).await;
        let result = aggregate(checks);
        debug!(
            available = result.available,
            teams_checked = teams.len(),
            free_teams = result.available_teams.len(),
            "availability checked"
        );
        Ok(result)
    }

    /// Same overlap test scoped to one team. Fails with `TeamMappingMissing`
    /// when the team has no enabled mapping.
    #[instrument(skip(self, request), fields(location_id = %request.location_id))]
    pub async fn check_team_availability(
        &self,
        team_id: &str,
        request: &AvailabilityRequest,
    ) -> Result<AvailabilityResult> {
        let window = TimeWindow::new(request.start, request.end)?;
        let mapping = self
            .mappings
            .resolve_calendar_for_team(&request.location_id, team_id)
            .await?
            .ok_or_else(|| FieldBridgeError::team_mapping_missing(&request.location_id, team_id))?;
        let checks = self.check_teams(std::slice::from_ref(&mapping), &window, request).await;
        Ok(aggregate(checks))
    }

    /// First free team in mapping order.
    pub async fn first_available_team(&self, request: &AvailabilityRequest) -> Result<Option<TeamRef>> {
        let result = self.check_availability(request).await?;
        Ok(result.available_teams.into_iter().next())
    }

    async fn check_teams(
        &self,
        teams: &[TeamCalendarMapping],
        window: &TimeWindow,
        request: &AvailabilityRequest,
    ) -> Vec<TeamCheck> {
        let buffered = window.expanded(request.buffer_minutes);
        let excluded: HashSet<&str> =
            request.exclude_appointment_ids.iter().map(String::as_str).collect();

        // join_all keeps input order, which is the mapping order
        join_all(teams.iter().map(|mapping| self.check_team(mapping, &buffered, &excluded))).await
    }

    async fn check_team(
        &self,
        mapping: &TeamCalendarMapping,
        buffered: &TimeWindow,
        excluded: &HashSet<&str>,
    ) -> TeamCheck {
        let team = TeamRef { team_id: mapping.fss_team_id.clone(), team_name: mapping.fss_team_name.clone() };

        let listed = call_remote(
            self.fss.system(),
            "list_appointments",
            self.request_timeout,
            self.fss.list_appointments(&mapping.fss_team_id, buffered),
        )
        .await;

        let appointments = match listed {
            Ok(appointments) => appointments,
            Err(err) => {
                warn!(team_id = %team.team_id, error = %err, "treating team as unavailable");
                let conflict = AvailabilityConflict {
                    team_id: team.team_id.clone(),
                    team_name: team.team_name.clone(),
                    competing_appointment: None,
                    overlap_type: OverlapType::FetchFailed,
                    error: Some(err.to_string()),
                };
                return TeamCheck { team, conflicts: vec![conflict] };
            }
        };

        let conflicts = appointments
            .iter()
            .filter(|existing| !existing.is_cancelled())
            .filter(|existing| !excluded.contains(existing.id.as_str()))
            .filter_map(|existing| {
                OverlapType::classify(&existing.window(), buffered).map(|overlap_type| {
                    AvailabilityConflict {
                        team_id: team.team_id.clone(),
                        team_name: team.team_name.clone(),
                        competing_appointment: Some(CompetingAppointment::from(existing)),
                        overlap_type,
                        error: None,
                    }
                })
            })
            .collect();

        TeamCheck { team, conflicts }
    }
}

fn aggregate(checks: Vec<TeamCheck>) -> AvailabilityResult {
    let mut result = AvailabilityResult::default();
    for check in checks {
        if check.conflicts.is_empty() {
            result.available_teams.push(check.team);
        } else {
            result.conflicts.extend(check.conflicts);
        }
    }
    result.available = !result.available_teams.is_empty();
    result
}
