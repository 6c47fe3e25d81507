//! Mapping service - the only place that decides which teams and calendars
//! take part in availability checks and routing.

use std::sync::Arc;

use fieldbridge_domain::{FieldBridgeError, Result, TeamCalendarMapping};
use tracing::{debug, info, instrument};

use super::ports::TeamCalendarMappingStore;

#[derive(Clone)]
pub struct TeamCalendarMappingService {
    store: Arc<dyn TeamCalendarMappingStore>,
}

impl TeamCalendarMappingService {
    pub fn new(store: Arc<dyn TeamCalendarMappingStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, mapping), fields(location_id = %mapping.location_id, team_id = %mapping.fss_team_id))]
    pub async fn upsert(&self, mapping: &TeamCalendarMapping) -> Result<()> {
        mapping.validate()?;
        self.store.upsert_mapping(mapping).await?;
        info!(calendar_id = %mapping.crm_calendar_id, enabled = mapping.enabled, "team mapping saved");
        Ok(())
    }

    /// Disabling keeps the row so historical sync records still resolve.
    #[instrument(skip(self))]
    pub async fn set_enabled(&self, location_id: &str, fss_team_id: &str, enabled: bool) -> Result<()> {
        if self.store.set_mapping_enabled(location_id, fss_team_id, enabled).await? {
            info!("team mapping toggled");
            Ok(())
        } else {
            Err(FieldBridgeError::NotFound(format!(
                "team mapping {fss_team_id} at location {location_id}"
            )))
        }
    }

    pub async fn list(&self, location_id: &str) -> Result<Vec<TeamCalendarMapping>> {
        self.store.list_mappings(location_id).await
    }

    /// Enabled mappings only, in mapping order.
    pub async fn list_enabled(&self, location_id: &str) -> Result<Vec<TeamCalendarMapping>> {
        let mappings = self.store.list_mappings(location_id).await?;
        Ok(mappings.into_iter().filter(|m| m.enabled).collect())
    }

    /// Outbound routing: the CRM calendar for an FSS team.
    pub async fn resolve_calendar_for_team(
        &self,
        location_id: &str,
        fss_team_id: &str,
    ) -> Result<Option<TeamCalendarMapping>> {
        let mapping = self.store.get_mapping(location_id, fss_team_id).await?;
        let resolved = mapping.filter(|m| m.enabled);
        if resolved.is_none() {
            debug!(location_id, fss_team_id, "no enabled calendar for team");
        }
        Ok(resolved)
    }

    /// Inbound routing: the FSS team behind a CRM calendar. The first
    /// enabled mapping wins if a calendar is mapped more than once.
    pub async fn resolve_team_for_calendar(
        &self,
        location_id: &str,
        crm_calendar_id: &str,
    ) -> Result<Option<TeamCalendarMapping>> {
        let mappings = self.list_enabled(location_id).await?;
        let resolved = mappings.into_iter().find(|m| m.crm_calendar_id == crm_calendar_id);
        if resolved.is_none() {
            debug!(location_id, crm_calendar_id, "no enabled team for calendar");
        }
        Ok(resolved)
    }
}
