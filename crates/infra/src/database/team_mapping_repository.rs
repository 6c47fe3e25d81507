//! Team/calendar mapping repository

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use fieldbridge_common::storage::{SqliteConnection, StorageError, StorageResult};
use fieldbridge_core::TeamCalendarMappingStore;
use fieldbridge_domain::{Result as DomainResult, TeamCalendarMapping};
use rusqlite::{params, Row};
use tokio::task;

use super::columns::{from_millis, to_millis};
use super::manager::DbManager;
use crate::errors::{map_join_error, map_storage_error};

/// SQLite-backed [`TeamCalendarMappingStore`]
pub struct SqliteTeamMappingRepository {
    db: Arc<DbManager>,
}

impl SqliteTeamMappingRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TeamCalendarMappingStore for SqliteTeamMappingRepository {
    async fn upsert_mapping(&self, mapping: &TeamCalendarMapping) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let mapping = mapping.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            upsert_mapping(&conn, &mapping).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get_mapping(
        &self,
        location_id: &str,
        fss_team_id: &str,
    ) -> DomainResult<Option<TeamCalendarMapping>> {
        let db = Arc::clone(&self.db);
        let location_id = location_id.to_string();
        let fss_team_id = fss_team_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<TeamCalendarMapping>> {
            let conn = db.get_connection()?;
            query_mapping(&conn, &location_id, &fss_team_id).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_mappings(&self, location_id: &str) -> DomainResult<Vec<TeamCalendarMapping>> {
        let db = Arc::clone(&self.db);
        let location_id = location_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<TeamCalendarMapping>> {
            let conn = db.get_connection()?;
            query_mappings(&conn, &location_id).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_mapping_enabled(
        &self,
        location_id: &str,
        fss_team_id: &str,
        enabled: bool,
    ) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let location_id = location_id.to_string();
        let fss_team_id = fss_team_id.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            update_enabled(&conn, &location_id, &fss_team_id, enabled).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn upsert_mapping(conn: &SqliteConnection, mapping: &TeamCalendarMapping) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO team_calendar_mappings (
            location_id, fss_team_id, fss_team_name, crm_calendar_id, crm_calendar_name,
            enabled, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(location_id, fss_team_id) DO UPDATE SET
            fss_team_name = excluded.fss_team_name,
            crm_calendar_id = excluded.crm_calendar_id,
            crm_calendar_name = excluded.crm_calendar_name,
            enabled = excluded.enabled,
            updated_at = excluded.updated_at",
        params![
            &mapping.location_id,
            &mapping.fss_team_id,
            &mapping.fss_team_name,
            &mapping.crm_calendar_id,
            &mapping.crm_calendar_name,
            mapping.enabled,
            to_millis(mapping.created_at),
            to_millis(mapping.updated_at),
        ],
    )?;
    Ok(())
}

fn query_mapping(
    conn: &SqliteConnection,
    location_id: &str,
    fss_team_id: &str,
) -> StorageResult<Option<TeamCalendarMapping>> {
    let sql = "SELECT location_id, fss_team_id, fss_team_name, crm_calendar_id, crm_calendar_name,
                      enabled, created_at, updated_at
               FROM team_calendar_mappings
               WHERE location_id = ?1 AND fss_team_id = ?2";

    match conn.query_row(sql, params![location_id, fss_team_id], map_mapping_row) {
        Ok(mapping) => Ok(Some(mapping)),
        Err(StorageError::Rusqlite(rusqlite::Error::QueryReturnedNoRows)) => Ok(None),
        Err(err) => Err(err),
    }
}

fn query_mappings(
    conn: &SqliteConnection,
    location_id: &str,
) -> StorageResult<Vec<TeamCalendarMapping>> {
    let sql = "SELECT location_id, fss_team_id, fss_team_name, crm_calendar_id, crm_calendar_name,
                      enabled, created_at, updated_at
               FROM team_calendar_mappings
               WHERE location_id = ?1
               ORDER BY created_at ASC, rowid ASC";

    let mut stmt = conn.prepare(sql)?;
    stmt.query_map(params![location_id], map_mapping_row)
}

fn update_enabled(
    conn: &SqliteConnection,
    location_id: &str,
    fss_team_id: &str,
    enabled: bool,
) -> StorageResult<bool> {
    let changed = conn.execute(
        "UPDATE team_calendar_mappings SET enabled = ?1, updated_at = ?2
         WHERE location_id = ?3 AND fss_team_id = ?4",
        params![enabled, to_millis(Utc::now()), location_id, fss_team_id],
    )?;
    Ok(changed > 0)
}

fn map_mapping_row(row: &Row<'_>) -> rusqlite::Result<TeamCalendarMapping> {
    Ok(TeamCalendarMapping {
        location_id: row.get(0)?,
        fss_team_id: row.get(1)?,
        fss_team_name: row.get(2)?,
        crm_calendar_id: row.get(3)?,
        crm_calendar_name: row.get(4)?,
        enabled: row.get(5)?,
        created_at: from_millis(6, row.get(6)?)?,
        updated_at: from_millis(7, row.get(7)?)?,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone};
    use tempfile::TempDir;

    use super::*;

    fn created(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap() + Duration::minutes(minute)
    }

    async fn setup_repository() -> (SqliteTeamMappingRepository, Arc<DbManager>, TempDir) {
        let temp_dir = TempDir::new().expect("temp dir created");
        let db_path = temp_dir.path().join("mappings.db");

        let manager = Arc::new(DbManager::new(&db_path, 4).expect("db manager created"));
        manager.run_migrations().expect("migrations run");

        let repo = SqliteTeamMappingRepository::new(manager.clone());
        (repo, manager, temp_dir)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upsert_replaces_calendar_but_keeps_creation_time() {
        let (repo, _manager, _dir) = setup_repository().await;

        let original = TeamCalendarMapping::new("loc-1", "T1", "C1", created(0)).with_names("Crew", "Main");
        repo.upsert_mapping(&original).await.expect("mapping stored");

        let mut replacement = TeamCalendarMapping::new("loc-1", "T1", "C9", created(10));
        replacement.updated_at = created(10);
        repo.upsert_mapping(&replacement).await.expect("mapping replaced");

        let stored = repo.get_mapping("loc-1", "T1").await.unwrap().unwrap();
        assert_eq!(stored.crm_calendar_id, "C9");
        assert_eq!(stored.created_at, created(0));
        assert_eq!(stored.updated_at, created(10));
        assert!(stored.fss_team_name.is_none());
        assert_eq!(repo.list_mappings("loc-1").await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn list_is_in_creation_order() {
        let (repo, _manager, _dir) = setup_repository().await;

        repo.upsert_mapping(&TeamCalendarMapping::new("loc-1", "T2", "C2", created(5))).await.unwrap();
        repo.upsert_mapping(&TeamCalendarMapping::new("loc-1", "T1", "C1", created(0))).await.unwrap();
        repo.upsert_mapping(&TeamCalendarMapping::new("loc-2", "T7", "C7", created(1))).await.unwrap();

        let teams: Vec<_> =
            repo.list_mappings("loc-1").await.unwrap().into_iter().map(|m| m.fss_team_id).collect();
        assert_eq!(teams, vec!["T1".to_string(), "T2".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn toggling_reports_whether_a_row_exists() {
        let (repo, _manager, _dir) = setup_repository().await;
        repo.upsert_mapping(&TeamCalendarMapping::new("loc-1", "T1", "C1", created(0))).await.unwrap();

        assert!(repo.set_mapping_enabled("loc-1", "T1", false).await.unwrap());
        assert!(!repo.get_mapping("loc-1", "T1").await.unwrap().unwrap().enabled);
        assert!(!repo.set_mapping_enabled("loc-1", "T404", false).await.unwrap());
    }
}
