//! Port interfaces for team/calendar mappings

use async_trait::async_trait;
use fieldbridge_domain::{Result, TeamCalendarMapping};

/// CRUD over mappings keyed by `(location_id, fss_team_id)`.
#[async_trait]
pub trait TeamCalendarMappingStore: Send + Sync {
    /// Insert or replace the mapping for `(location_id, fss_team_id)`
    async fn upsert_mapping(&self, mapping: &TeamCalendarMapping) -> Result<()>;

    async fn get_mapping(
        &self,
        location_id: &str,
        fss_team_id: &str,
    ) -> Result<Option<TeamCalendarMapping>>;

    /// All mappings for a location, enabled or not, in stable creation order
    async fn list_mappings(&self, location_id: &str) -> Result<Vec<TeamCalendarMapping>>;

    /// Returns `false` when no such mapping exists
    async fn set_mapping_enabled(
        &self,
        location_id: &str,
        fss_team_id: &str,
        enabled: bool,
    ) -> Result<bool>;
}
