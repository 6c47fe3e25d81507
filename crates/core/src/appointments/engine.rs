//! Appointment sync engine
//!
//! Per appointment the engine walks the explicit [`SyncState`] machine:
//!
//! - no record, or a half record without the counterpart id: route through
//!   the team/calendar mapping, claim the create with a conditional write,
//!   write the counterpart, store both ids. A pass that loses the claim
//!   reports `InFlight` and writes nothing
//! - record present and the trigger side has not advanced: no-op
//! - record present and changed: ask the resolver; the winner is pushed to
//!   the other system, a losing change is discarded for this pass and the
//!   record is parked in `ConflictPending` for the next pass to settle
//!
//! No in-process locks are taken. Concurrent passes for the same appointment
//! converge through the store's create claim and constrained upsert.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fieldbridge_domain::constants::{
    DEFAULT_LOOKAHEAD_DAYS, DEFAULT_LOOKBACK_DAYS, DEFAULT_MAX_CONCURRENCY,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
use fieldbridge_domain::{
    Appointment, AppointmentSyncRecord, AvailabilityRequest, ConflictPolicy, ExternalSystem,
    FieldBridgeError, IntegrationConfig, ItemSyncResult, Result, SyncAllReport, SyncDirection,
    SyncOutcome, SyncRecordStatus, SyncState, TimeWindow, UpsertedRecord,
};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use super::ports::{AppointmentSyncStore, IntegrationConfigStore};
use crate::availability::AvailabilityService;
use crate::clock::{Clock, SystemClock};
use crate::conflict::{resolve, resolve_timestamps};
use crate::gateway_ports::AppointmentGateway;
use crate::mapping::ports::TeamCalendarMappingStore;
use crate::mapping::TeamCalendarMappingService;
use crate::remote::call_remote;

/// Tuning knobs, normally taken from the `sync` config section.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub request_timeout: Duration,
    pub lookback_days: u32,
    pub lookahead_days: u32,
    pub max_concurrency: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Location-level settings that steer a pass.
#[derive(Debug, Clone, Copy)]
struct LocationPolicy {
    conflict: ConflictPolicy,
    buffer_minutes: u32,
}

impl LocationPolicy {
    fn from_config(config: Option<&IntegrationConfig>) -> Self {
        match config {
            Some(config) => Self {
                conflict: config.appointment_conflict_resolution,
                buffer_minutes: config.default_buffer_minutes,
            },
            None => Self { conflict: ConflictPolicy::default(), buffer_minutes: 0 },
        }
    }
}

/// Where a propagated appointment lands.
#[derive(Debug, Clone)]
struct Route {
    target_resource_id: String,
    crm_calendar_id: String,
    fss_team_id: String,
}

/// One unit of work inside `sync_all`.
enum WorkUnit {
    Single(Appointment),
    Pair { fss: Appointment, crm: Appointment, record: AppointmentSyncRecord },
    Failed { source: ExternalSystem, appointment_id: String, error: FieldBridgeError },
}

pub struct AppointmentSyncEngine {
    fss: Arc<dyn AppointmentGateway>,
    crm: Arc<dyn AppointmentGateway>,
    records: Arc<dyn AppointmentSyncStore>,
    configs: Arc<dyn IntegrationConfigStore>,
    mappings: TeamCalendarMappingService,
    availability: AvailabilityService,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl AppointmentSyncEngine {
    pub fn new(
        fss: Arc<dyn AppointmentGateway>,
        crm: Arc<dyn AppointmentGateway>,
        records: Arc<dyn AppointmentSyncStore>,
        mapping_store: Arc<dyn TeamCalendarMappingStore>,
        configs: Arc<dyn IntegrationConfigStore>,
    ) -> Self {
        let mappings = TeamCalendarMappingService::new(mapping_store);
        let settings = EngineSettings::default();
        let availability = AvailabilityService::new(mappings.clone(), Arc::clone(&fss))
            .with_request_timeout(settings.request_timeout);
        Self {
            fss,
            crm,
            records,
            configs,
            mappings,
            availability,
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.availability = AvailabilityService::new(self.mappings.clone(), Arc::clone(&self.fss))
            .with_request_timeout(settings.request_timeout);
        self.settings = settings;
        self
    }

    /// Propagate one FSS appointment to the CRM.
    ///
    /// Only malformed input is returned as `Err`; routing gaps and remote
    /// failures come back as a failed [`ItemSyncResult`].
    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    pub async fn sync_from_fss_to_crm(
        &self,
        appointment: &Appointment,
        location_id: &str,
    ) -> Result<ItemSyncResult> {
        self.sync_single(ExternalSystem::Fss, appointment, location_id).await
    }

    /// Propagate one CRM appointment to the FSS.
    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    pub async fn sync_from_crm_to_fss(
        &self,
        appointment: &Appointment,
        location_id: &str,
    ) -> Result<ItemSyncResult> {
        self.sync_single(ExternalSystem::Crm, appointment, location_id).await
    }

    /// Full bidirectional pass over the reconciliation window.
    ///
    /// Item failures are caught and reported in the results; they never
    /// abort sibling items.
    #[instrument(skip(self))]
    pub async fn sync_all(&self, location_id: &str) -> Result<SyncAllReport> {
        let config = self
            .configs
            .get_config(location_id)
            .await?
            .ok_or_else(|| FieldBridgeError::NotFound(format!("integration config {location_id}")))?;
        let policy = LocationPolicy::from_config(Some(&config));
        let window = TimeWindow::around(
            self.clock.now(),
            self.settings.lookback_days,
            self.settings.lookahead_days,
        )?;
        let mappings = self.mappings.list_enabled(location_id).await?;

        let mut report = SyncAllReport::new(location_id);

        let teams = dedup(mappings.iter().map(|m| m.fss_team_id.clone()));
        let calendars = dedup(
            mappings
                .iter()
                .map(|m| m.crm_calendar_id.clone())
                .chain(config.default_crm_calendar_id.clone()),
        );

        let fss_appointments = self.list_everywhere(&self.fss, &teams, &window, &mut report).await;
        let crm_appointments = self.list_everywhere(&self.crm, &calendars, &window, &mut report).await;
        debug!(
            fss = fss_appointments.len(),
            crm = crm_appointments.len(),
            "appointments listed for reconciliation"
        );

        let units = self.pair_units(fss_appointments, crm_appointments).await;
        let concurrency = self.settings.max_concurrency.max(1);
        let results: Vec<ItemSyncResult> = stream::iter(units)
            .map(|unit| self.run_unit(unit, location_id, policy))
            .buffered(concurrency)
            .collect()
            .await;

        for result in results {
            report.record(result);
        }

        info!(
            synced = report.synced,
            skipped = report.skipped,
            errors = report.errors,
            "appointment sync pass finished"
        );
        Ok(report)
    }

    /// Status reporting over stored correlation records.
    pub async fn list_sync_records(&self, location_id: &str) -> Result<Vec<AppointmentSyncRecord>> {
        self.records.list_records_by_location(location_id).await
    }

    // ========================================================================
    // Single-item entry points
    // ========================================================================

    async fn sync_single(
        &self,
        expected_source: ExternalSystem,
        appointment: &Appointment,
        location_id: &str,
    ) -> Result<ItemSyncResult> {
        validate_trigger(expected_source, appointment, location_id)?;
        let config = self.configs.get_config(location_id).await?;
        let policy = LocationPolicy::from_config(config.as_ref());

        match self.reconcile_one(appointment, location_id, policy).await {
            Ok(result) => Ok(result),
            Err(err) => {
                warn!(error = %err, kind = %err.kind(), "appointment sync failed");
                Ok(ItemSyncResult::failed(appointment.source, &appointment.id, &err))
            }
        }
    }

    async fn run_unit(&self, unit: WorkUnit, location_id: &str, policy: LocationPolicy) -> ItemSyncResult {
        let (source, appointment_id, outcome) = match unit {
            WorkUnit::Single(appointment) => {
                let outcome = self.reconcile_one(&appointment, location_id, policy).await;
                (appointment.source, appointment.id, outcome)
            }
            WorkUnit::Pair { fss, crm, record } => {
                let outcome = self.reconcile_pair(&fss, &crm, record, location_id, policy).await;
                (ExternalSystem::Fss, fss.id, outcome)
            }
            WorkUnit::Failed { source, appointment_id, error } => {
                (source, appointment_id, Err(error))
            }
        };

        outcome.unwrap_or_else(|err| {
            warn!(%source, appointment_id = %appointment_id, error = %err, kind = %err.kind(), "item failed");
            ItemSyncResult::failed(source, appointment_id, &err)
        })
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    async fn reconcile_one(
        &self,
        appointment: &Appointment,
        location_id: &str,
        policy: LocationPolicy,
    ) -> Result<ItemSyncResult> {
        let source = appointment.source;
        let existing = self.find_record(source, &appointment.id).await?;

        match existing {
            Some(record) if record.id_for(source.counterpart()).is_some() => {
                self.update_existing(appointment, record, policy).await
            }
            half_or_none => self.create_counterpart(appointment, location_id, policy, half_or_none).await,
        }
    }

    /// Both sides are linked and were both listed in this pass.
    async fn reconcile_pair(
        &self,
        fss: &Appointment,
        crm: &Appointment,
        record: AppointmentSyncRecord,
        location_id: &str,
        policy: LocationPolicy,
    ) -> Result<ItemSyncResult> {
        let fss_changed = !record.is_unchanged(ExternalSystem::Fss, fss.last_modified);
        let crm_changed = !record.is_unchanged(ExternalSystem::Crm, crm.last_modified);
        let pending = record.state == SyncState::ConflictPending;

        // a pending conflict is settled on live versions, even if only one
        // side moved since it was parked
        match (fss_changed, crm_changed, pending) {
            (false, false, false) => Ok(ItemSyncResult::ok(
                ExternalSystem::Fss,
                &fss.id,
                Some(crm.id.clone()),
                SyncOutcome::Unchanged,
            )),
            (true, false, false) => self.update_existing(fss, record, policy).await,
            (false, true, false) => self.update_existing(crm, record, policy).await,
            _ => {
                let resolution = resolve(fss, crm, policy.conflict);
                info!(
                    location_id,
                    fss_id = %fss.id,
                    crm_id = %crm.id,
                    winner = %resolution.winner,
                    policy = %policy.conflict,
                    "both sides changed, applying winner"
                );
                self.push_winner(resolution.record, record, policy).await
            }
        }
    }

    async fn create_counterpart(
        &self,
        appointment: &Appointment,
        location_id: &str,
        policy: LocationPolicy,
        half_record: Option<AppointmentSyncRecord>,
    ) -> Result<ItemSyncResult> {
        let source = appointment.source;
        if appointment.is_cancelled() {
            debug!(%source, appointment_id = %appointment.id, "cancelled appointment has no counterpart, nothing to create");
            return Ok(ItemSyncResult::ok(source, &appointment.id, None, SyncOutcome::Unchanged));
        }

        let mut route = self.route(appointment, location_id).await?;
        if source == ExternalSystem::Crm {
            route = self.place_on_free_team(appointment, location_id, route, policy).await;
        }

        let now = self.clock.now();
        let base = half_record.unwrap_or_else(|| {
            AppointmentSyncRecord::new(
                location_id,
                &route.crm_calendar_id,
                SyncDirection::from_source(source),
                policy.conflict,
                now,
            )
        });

        // Only the pass that wins the claim writes the counterpart. A claim
        // left behind by a failed or crashed pass expires after the lease.
        let mut claim = attach(base, source, &appointment.id, appointment.last_modified);
        claim.crm_calendar_id = route.crm_calendar_id.clone();
        claim.fss_team_id = Some(route.fss_team_id.clone());
        claim.updated_at = now;
        let Some(in_flight) = self.records.claim_create(&claim, self.claim_stale_before(now)).await? else {
            debug!(%source, appointment_id = %appointment.id, "counterpart create already claimed by another pass");
            return Ok(ItemSyncResult::ok(source, &appointment.id, None, SyncOutcome::InFlight));
        };

        let target = source.counterpart();
        let written = self.write_target(target, &route.target_resource_id, None, appointment).await?;

        let mut record = attach(in_flight, target, &written.id, written.last_modified);
        record.state = SyncState::Synced;
        record.updated_at = self.clock.now();
        self.records.upsert_record(&record).await?;

        info!(
            %source,
            appointment_id = %appointment.id,
            counterpart_id = %written.id,
            "counterpart created"
        );
        Ok(ItemSyncResult::ok(source, &appointment.id, Some(written.id), SyncOutcome::Created))
    }

    async fn update_existing(
        &self,
        appointment: &Appointment,
        mut record: AppointmentSyncRecord,
        policy: LocationPolicy,
    ) -> Result<ItemSyncResult> {
        let source = appointment.source;
        let target = source.counterpart();
        let counterpart_id = record.id_for(target).map(str::to_string);

        if record.is_unchanged(source, appointment.last_modified)
            && record.state != SyncState::ConflictPending
        {
            debug!(%source, appointment_id = %appointment.id, "unchanged since last sync");
            return Ok(ItemSyncResult::ok(source, &appointment.id, counterpart_id, SyncOutcome::Unchanged));
        }

        let (fss_modified, crm_modified) = match source {
            ExternalSystem::Fss => (Some(appointment.last_modified), record.crm_last_modified),
            ExternalSystem::Crm => (record.fss_last_modified, Some(appointment.last_modified)),
        };
        let winner = resolve_timestamps(policy.conflict, fss_modified, crm_modified);

        if winner != source {
            record.state = SyncState::ConflictPending;
            record.conflict_resolution = policy.conflict;
            record.updated_at = self.clock.now();
            self.records.upsert_record(&record).await?;
            info!(
                %source,
                appointment_id = %appointment.id,
                policy = %policy.conflict,
                "stale change discarded, left for the {} pass", target
            );
            return Ok(ItemSyncResult::ok(
                source,
                &appointment.id,
                counterpart_id,
                SyncOutcome::SkippedConflict,
            ));
        }

        self.push_winner(appointment, record, policy).await
    }

    /// Apply `winner` to the other system and advance both stored timestamps.
    async fn push_winner(
        &self,
        winner: &Appointment,
        record: AppointmentSyncRecord,
        policy: LocationPolicy,
    ) -> Result<ItemSyncResult> {
        let source = winner.source;
        let target = source.counterpart();
        let target_id = record
            .id_for(target)
            .map(str::to_string)
            .ok_or_else(|| FieldBridgeError::Internal(format!("record {} has no {target} id", record.id)))?;

        let mut route = self.route(winner, &record.location_id).await?;
        if source == ExternalSystem::Crm && record.crm_calendar_id == winner.resource_id {
            // keep the team the appointment was originally placed on
            if let Some(team) = record.fss_team_id.clone() {
                route.target_resource_id = team.clone();
                route.fss_team_id = team;
            }
        }

        let written = self
            .write_target(target, &route.target_resource_id, Some(&target_id), winner)
            .await?;

        let updated = attach(record, source, &winner.id, winner.last_modified);
        let mut updated = attach(updated, target, &written.id, written.last_modified);
        updated.state = SyncState::Synced;
        updated.status =
            if winner.is_cancelled() { SyncRecordStatus::Cancelled } else { SyncRecordStatus::Active };
        updated.sync_direction = SyncDirection::from_source(source);
        updated.conflict_resolution = policy.conflict;
        updated.crm_calendar_id = route.crm_calendar_id;
        updated.fss_team_id = Some(route.fss_team_id);
        updated.updated_at = self.clock.now();
        self.records.upsert_record(&updated).await?;

        info!(%source, appointment_id = %winner.id, counterpart_id = %written.id, "counterpart updated");
        Ok(ItemSyncResult::ok(source, &winner.id, Some(written.id), SyncOutcome::Updated))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Half rows touched after this instant are a live create claim. The
    /// lease covers one remote write with room to spare.
    fn claim_stale_before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.settings.request_timeout.saturating_mul(2))
            .ok()
            .and_then(|lease| now.checked_sub_signed(lease))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn gateway(&self, system: ExternalSystem) -> &Arc<dyn AppointmentGateway> {
        match system {
            ExternalSystem::Fss => &self.fss,
            ExternalSystem::Crm => &self.crm,
        }
    }

    async fn find_record(
        &self,
        system: ExternalSystem,
        appointment_id: &str,
    ) -> Result<Option<AppointmentSyncRecord>> {
        match system {
            ExternalSystem::Fss => self.records.get_record(Some(appointment_id), None).await,
            ExternalSystem::Crm => self.records.get_record(None, Some(appointment_id)).await,
        }
    }

    /// Resolve the enabled mapping that routes `appointment` to the other
    /// system.
    async fn route(&self, appointment: &Appointment, location_id: &str) -> Result<Route> {
        match appointment.source {
            ExternalSystem::Fss => {
                let mapping = self
                    .mappings
                    .resolve_calendar_for_team(location_id, &appointment.resource_id)
                    .await?
                    .ok_or_else(|| {
                        FieldBridgeError::team_mapping_missing(location_id, &appointment.resource_id)
                    })?;
                Ok(Route {
                    target_resource_id: mapping.crm_calendar_id.clone(),
                    crm_calendar_id: mapping.crm_calendar_id,
                    fss_team_id: mapping.fss_team_id,
                })
            }
            ExternalSystem::Crm => {
                let mapping = self
                    .mappings
                    .resolve_team_for_calendar(location_id, &appointment.resource_id)
                    .await?
                    .ok_or_else(|| {
                        FieldBridgeError::team_mapping_missing(location_id, &appointment.resource_id)
                    })?;
                Ok(Route {
                    target_resource_id: mapping.fss_team_id.clone(),
                    crm_calendar_id: appointment.resource_id.clone(),
                    fss_team_id: mapping.fss_team_id,
                })
            }
        }
    }

    /// New CRM bookings go to the mapped team when it is free, otherwise to
    /// the first free interchangeable team. With no free team the mapped team
    /// is kept and the double booking is logged.
    async fn place_on_free_team(
        &self,
        appointment: &Appointment,
        location_id: &str,
        route: Route,
        policy: LocationPolicy,
    ) -> Route {
        let request = AvailabilityRequest::new(location_id, appointment.start, appointment.end)
            .with_buffer(policy.buffer_minutes);

        match self.availability.check_availability(&request).await {
            Ok(result) if result.is_team_available(&route.fss_team_id) => route,
            Ok(result) => match result.first_available_team() {
                Some(team) => {
                    info!(
                        appointment_id = %appointment.id,
                        mapped_team = %route.fss_team_id,
                        assigned_team = %team.team_id,
                        "mapped team busy, booking on first free team"
                    );
                    Route {
                        target_resource_id: team.team_id.clone(),
                        fss_team_id: team.team_id.clone(),
                        crm_calendar_id: route.crm_calendar_id,
                    }
                }
                None => {
                    warn!(
                        appointment_id = %appointment.id,
                        team_id = %route.fss_team_id,
                        conflicts = result.conflicts.len(),
                        "no free team for CRM booking, keeping mapped team"
                    );
                    route
                }
            },
            Err(err) => {
                warn!(appointment_id = %appointment.id, error = %err, "availability check failed, keeping mapped team");
                route
            }
        }
    }

    async fn write_target(
        &self,
        target: ExternalSystem,
        resource_id: &str,
        existing_id: Option<&str>,
        appointment: &Appointment,
    ) -> Result<UpsertedRecord> {
        let draft = appointment.to_draft();
        call_remote(
            target,
            "upsert_appointment",
            self.settings.request_timeout,
            self.gateway(target).upsert_appointment(resource_id, existing_id, &draft),
        )
        .await
    }

    /// List appointments on every resource; a failed listing is recorded on
    /// the report and the remaining resources are still listed.
    async fn list_everywhere(
        &self,
        gateway: &Arc<dyn AppointmentGateway>,
        resources: &[String],
        window: &TimeWindow,
        report: &mut SyncAllReport,
    ) -> Vec<Appointment> {
        let system = gateway.system();
        let mut seen = HashSet::new();
        let mut appointments = Vec::new();

        for resource_id in resources {
            let listed = call_remote(
                system,
                "list_appointments",
                self.settings.request_timeout,
                gateway.list_appointments(resource_id, window),
            )
            .await;

            match listed {
                Ok(found) => {
                    appointments.extend(found.into_iter().filter(|a| seen.insert(a.id.clone())));
                }
                Err(err) => {
                    warn!(%system, resource_id = %resource_id, error = %err, "listing failed");
                    report.record_listing_error(format!("{system} {resource_id}: {err}"));
                }
            }
        }
        appointments
    }

    /// Pair FSS appointments with their linked CRM counterparts so each
    /// logical appointment is reconciled exactly once per pass.
    async fn pair_units(&self, fss: Vec<Appointment>, crm: Vec<Appointment>) -> Vec<WorkUnit> {
        let index: HashMap<String, usize> =
            crm.iter().enumerate().map(|(i, a)| (a.id.clone(), i)).collect();
        let mut crm_slots: Vec<Option<Appointment>> = crm.into_iter().map(Some).collect();
        let mut units = Vec::with_capacity(fss.len() + crm_slots.len());

        for appointment in fss {
            match self.records.get_record(Some(&appointment.id), None).await {
                Ok(Some(record)) => {
                    let linked = record
                        .crm_appointment_id
                        .as_deref()
                        .and_then(|crm_id| index.get(crm_id))
                        .and_then(|&i| crm_slots[i].take());
                    match linked {
                        Some(crm) => units.push(WorkUnit::Pair { fss: appointment, crm, record }),
                        None => units.push(WorkUnit::Single(appointment)),
                    }
                }
                Ok(None) => units.push(WorkUnit::Single(appointment)),
                Err(error) => units.push(WorkUnit::Failed {
                    source: ExternalSystem::Fss,
                    appointment_id: appointment.id,
                    error,
                }),
            }
        }

        units.extend(crm_slots.into_iter().flatten().map(WorkUnit::Single));
        units
    }
}

fn validate_trigger(expected: ExternalSystem, appointment: &Appointment, location_id: &str) -> Result<()> {
    if appointment.source != expected {
        return Err(FieldBridgeError::InvalidInput(format!(
            "expected a {expected} appointment, got {}",
            appointment.source
        )));
    }
    if appointment.id.trim().is_empty() {
        return Err(FieldBridgeError::InvalidInput("appointment id is required".to_string()));
    }
    if appointment.resource_id.trim().is_empty() {
        return Err(FieldBridgeError::InvalidInput("appointment team/calendar id is required".to_string()));
    }
    if location_id.trim().is_empty() {
        return Err(FieldBridgeError::InvalidInput("location id is required".to_string()));
    }
    Ok(())
}

fn attach(
    record: AppointmentSyncRecord,
    system: ExternalSystem,
    appointment_id: &str,
    last_modified: DateTime<Utc>,
) -> AppointmentSyncRecord {
    match system {
        ExternalSystem::Fss => record.with_fss(appointment_id, last_modified),
        ExternalSystem::Crm => record.with_crm(appointment_id, last_modified),
    }
}

fn dedup(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| !id.trim().is_empty() && seen.insert(id.clone())).collect()
}
