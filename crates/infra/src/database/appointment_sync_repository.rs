//! Appointment sync record repository
//!
//! One row per logical appointment. Both external ids carry a UNIQUE
//! constraint and writes go through a single `INSERT .. ON CONFLICT .. DO
//! UPDATE` statement, so two concurrent passes that discover the same
//! appointment converge on one row instead of racing a read-then-write.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldbridge_common::storage::{SqliteConnection, StorageError, StorageResult};
use fieldbridge_core::AppointmentSyncStore;
use fieldbridge_domain::{AppointmentSyncRecord, Result as DomainResult};
use rusqlite::{params, Row};
use tokio::task;
use uuid::Uuid;

use super::columns::{from_millis, from_optional_millis, parse_text, to_millis};
use super::manager::DbManager;
use crate::errors::{map_join_error, map_storage_error};

const RECORD_COLUMNS: &str = "id, location_id, fss_appointment_id, crm_appointment_id, \
     crm_calendar_id, fss_team_id, fss_last_modified, crm_last_modified, sync_direction, \
     conflict_resolution, state, status, created_at, updated_at";

/// SQLite-backed [`AppointmentSyncStore`]
pub struct SqliteAppointmentSyncRepository {
    db: Arc<DbManager>,
}

impl SqliteAppointmentSyncRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AppointmentSyncStore for SqliteAppointmentSyncRepository {
    async fn get_record(
        &self,
        fss_appointment_id: Option<&str>,
        crm_appointment_id: Option<&str>,
    ) -> DomainResult<Option<AppointmentSyncRecord>> {
        let db = Arc::clone(&self.db);
        let fss_id = fss_appointment_id.map(str::to_string);
        let crm_id = crm_appointment_id.map(str::to_string);

        task::spawn_blocking(move || -> DomainResult<Option<AppointmentSyncRecord>> {
            let conn = db.get_connection()?;
            if let Some(fss_id) = fss_id.as_deref() {
                let found = query_by_column(&conn, "fss_appointment_id", fss_id)
                    .map_err(map_storage_error)?;
                if found.is_some() {
                    return Ok(found);
                }
            }
            match crm_id.as_deref() {
                Some(crm_id) => {
                    query_by_column(&conn, "crm_appointment_id", crm_id).map_err(map_storage_error)
                }
                None => Ok(None),
            }
        })
        .await
        .map_err(map_join_error)?
    }

    async fn upsert_record(
        &self,
        record: &AppointmentSyncRecord,
    ) -> DomainResult<AppointmentSyncRecord> {
        record.validate()?;

        let db = Arc::clone(&self.db);
        let record = record.clone();

        task::spawn_blocking(move || -> DomainResult<AppointmentSyncRecord> {
            let conn = db.get_connection()?;
            upsert(&conn, &record).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn claim_create(
        &self,
        record: &AppointmentSyncRecord,
        stale_before: DateTime<Utc>,
    ) -> DomainResult<Option<AppointmentSyncRecord>> {
        record.validate()?;

        let db = Arc::clone(&self.db);
        let record = record.clone();

        task::spawn_blocking(move || -> DomainResult<Option<AppointmentSyncRecord>> {
            let conn = db.get_connection()?;
            claim(&conn, &record, stale_before).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_records_by_location(
        &self,
        location_id: &str,
    ) -> DomainResult<Vec<AppointmentSyncRecord>> {
        let db = Arc::clone(&self.db);
        let location_id = location_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<AppointmentSyncRecord>> {
            let conn = db.get_connection()?;
            query_by_location(&conn, &location_id).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn query_by_column(
    conn: &SqliteConnection,
    column: &'static str,
    value: &str,
) -> StorageResult<Option<AppointmentSyncRecord>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM appointment_syncs WHERE {column} = ?1");

    match conn.query_row(&sql, params![value], map_record_row) {
        Ok(record) => Ok(Some(record)),
        Err(StorageError::Rusqlite(rusqlite::Error::QueryReturnedNoRows)) => Ok(None),
        Err(err) => Err(err),
    }
}

fn query_by_location(
    conn: &SqliteConnection,
    location_id: &str,
) -> StorageResult<Vec<AppointmentSyncRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM appointment_syncs
         WHERE location_id = ?1
         ORDER BY created_at ASC, rowid ASC"
    );

    let mut stmt = conn.prepare(&sql)?;
    stmt.query_map(params![location_id], map_record_row)
}

/// Insert, or merge into the row that already owns either external id.
///
/// Known ids and timestamps are never cleared by a write that omits them,
/// and `state` is re-derived from the merged ids. `id` and `created_at`
/// always stay with the first writer. A write whose ids belong to two
/// different rows fails on the second UNIQUE constraint.
fn upsert(
    conn: &SqliteConnection,
    record: &AppointmentSyncRecord,
) -> StorageResult<AppointmentSyncRecord> {
    const MERGE: &str = "
        location_id = excluded.location_id,
        fss_appointment_id = COALESCE(excluded.fss_appointment_id, appointment_syncs.fss_appointment_id),
        crm_appointment_id = COALESCE(excluded.crm_appointment_id, appointment_syncs.crm_appointment_id),
        crm_calendar_id = excluded.crm_calendar_id,
        fss_team_id = COALESCE(excluded.fss_team_id, appointment_syncs.fss_team_id),
        fss_last_modified = COALESCE(excluded.fss_last_modified, appointment_syncs.fss_last_modified),
        crm_last_modified = COALESCE(excluded.crm_last_modified, appointment_syncs.crm_last_modified),
        sync_direction = excluded.sync_direction,
        conflict_resolution = excluded.conflict_resolution,
        state = CASE
            WHEN COALESCE(excluded.fss_appointment_id, appointment_syncs.fss_appointment_id) IS NOT NULL
             AND COALESCE(excluded.crm_appointment_id, appointment_syncs.crm_appointment_id) IS NOT NULL
                THEN CASE WHEN excluded.state = 'conflict_pending' THEN 'conflict_pending' ELSE 'synced' END
            WHEN COALESCE(excluded.fss_appointment_id, appointment_syncs.fss_appointment_id) IS NOT NULL
                THEN 'fss_only'
            ELSE 'crm_only'
        END,
        status = excluded.status,
        updated_at = excluded.updated_at";

    let sql = format!(
        "INSERT INTO appointment_syncs ({RECORD_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(fss_appointment_id) DO UPDATE SET {MERGE}
         ON CONFLICT(crm_appointment_id) DO UPDATE SET {MERGE}
         RETURNING {RECORD_COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![
            record.id.to_string(),
            &record.location_id,
            &record.fss_appointment_id,
            &record.crm_appointment_id,
            &record.crm_calendar_id,
            &record.fss_team_id,
            record.fss_last_modified.map(to_millis),
            record.crm_last_modified.map(to_millis),
            record.sync_direction.as_str(),
            record.conflict_resolution.as_str(),
            record.state.as_str(),
            record.status.as_str(),
            to_millis(record.created_at),
            to_millis(record.updated_at),
        ],
        map_record_row,
    )
}

/// Insert the half row, or take over an unlinked one whose claim expired.
///
/// The `DO UPDATE .. WHERE` guard makes the statement return no row when the
/// existing row is linked or still fresh, which is how a lost claim shows.
fn claim(
    conn: &SqliteConnection,
    record: &AppointmentSyncRecord,
    stale_before: DateTime<Utc>,
) -> StorageResult<Option<AppointmentSyncRecord>> {
    const TAKE_OVER: &str = "
        crm_calendar_id = excluded.crm_calendar_id,
        fss_team_id = COALESCE(excluded.fss_team_id, appointment_syncs.fss_team_id),
        fss_last_modified = COALESCE(excluded.fss_last_modified, appointment_syncs.fss_last_modified),
        crm_last_modified = COALESCE(excluded.crm_last_modified, appointment_syncs.crm_last_modified),
        sync_direction = excluded.sync_direction,
        conflict_resolution = excluded.conflict_resolution,
        updated_at = excluded.updated_at";

    let sql = format!(
        "INSERT INTO appointment_syncs ({RECORD_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(fss_appointment_id) DO UPDATE SET {TAKE_OVER}
            WHERE appointment_syncs.crm_appointment_id IS NULL
              AND appointment_syncs.updated_at < ?15
         ON CONFLICT(crm_appointment_id) DO UPDATE SET {TAKE_OVER}
            WHERE appointment_syncs.fss_appointment_id IS NULL
              AND appointment_syncs.updated_at < ?15
         RETURNING {RECORD_COLUMNS}"
    );

    let claimed = conn.query_row(
        &sql,
        params![
            record.id.to_string(),
            &record.location_id,
            &record.fss_appointment_id,
            &record.crm_appointment_id,
            &record.crm_calendar_id,
            &record.fss_team_id,
            record.fss_last_modified.map(to_millis),
            record.crm_last_modified.map(to_millis),
            record.sync_direction.as_str(),
            record.conflict_resolution.as_str(),
            record.state.as_str(),
            record.status.as_str(),
            to_millis(record.created_at),
            to_millis(record.updated_at),
            to_millis(stale_before),
        ],
        map_record_row,
    );

    match claimed {
        Ok(record) => Ok(Some(record)),
        Err(StorageError::Rusqlite(rusqlite::Error::QueryReturnedNoRows)) => Ok(None),
        Err(err) => Err(err),
    }
}

fn map_record_row(row: &Row<'_>) -> rusqlite::Result<AppointmentSyncRecord> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(AppointmentSyncRecord {
        id,
        location_id: row.get(1)?,
        fss_appointment_id: row.get(2)?,
        crm_appointment_id: row.get(3)?,
        crm_calendar_id: row.get(4)?,
        fss_team_id: row.get(5)?,
        fss_last_modified: from_optional_millis(6, row.get(6)?)?,
        crm_last_modified: from_optional_millis(7, row.get(7)?)?,
        sync_direction: parse_text(8, &row.get::<_, String>(8)?)?,
        conflict_resolution: parse_text(9, &row.get::<_, String>(9)?)?,
        state: parse_text(10, &row.get::<_, String>(10)?)?,
        status: parse_text(11, &row.get::<_, String>(11)?)?,
        created_at: from_millis(12, row.get(12)?)?,
        updated_at: from_millis(13, row.get(13)?)?,
    })
}

// ============================================================================
// Tests
// ============================================================================
