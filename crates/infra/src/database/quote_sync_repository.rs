//! Quote sync record repository

use std::sync::Arc;

use async_trait::async_trait;
use fieldbridge_common::storage::{SqliteConnection, StorageError, StorageResult};
use fieldbridge_core::QuoteSyncStore;
use fieldbridge_domain::{QuoteSyncRecord, Result as DomainResult};
use rusqlite::{params, Row};
use tokio::task;

use super::columns::{from_millis, to_millis};
use super::manager::DbManager;
use crate::errors::{map_join_error, map_storage_error};

/// SQLite-backed [`QuoteSyncStore`], one row per `(location_id, fss_quote_id)`
pub struct SqliteQuoteSyncRepository {
    db: Arc<DbManager>,
}

impl SqliteQuoteSyncRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl QuoteSyncStore for SqliteQuoteSyncRepository {
    async fn get_quote_record(
        &self,
        location_id: &str,
        fss_quote_id: &str,
    ) -> DomainResult<Option<QuoteSyncRecord>> {
        let db = Arc::clone(&self.db);
        let location_id = location_id.to_string();
        let fss_quote_id = fss_quote_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<QuoteSyncRecord>> {
            let conn = db.get_connection()?;
            query_quote_record(&conn, &location_id, &fss_quote_id).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn upsert_quote_record(&self, record: &QuoteSyncRecord) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let record = record.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            upsert_quote_record(&conn, &record).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn query_quote_record(
    conn: &SqliteConnection,
    location_id: &str,
    fss_quote_id: &str,
) -> StorageResult<Option<QuoteSyncRecord>> {
    let sql = "SELECT location_id, fss_quote_id, crm_contact_id, crm_opportunity_id,
                      payload_fingerprint, last_synced_at
               FROM quote_sync WHERE location_id = ?1 AND fss_quote_id = ?2";

    match conn.query_row(sql, params![location_id, fss_quote_id], map_quote_row) {
        Ok(record) => Ok(Some(record)),
        Err(StorageError::Rusqlite(rusqlite::Error::QueryReturnedNoRows)) => Ok(None),
        Err(err) => Err(err),
    }
}

fn upsert_quote_record(conn: &SqliteConnection, record: &QuoteSyncRecord) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO quote_sync (
            location_id, fss_quote_id, crm_contact_id, crm_opportunity_id,
            payload_fingerprint, last_synced_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(location_id, fss_quote_id) DO UPDATE SET
            crm_contact_id = excluded.crm_contact_id,
            crm_opportunity_id = COALESCE(excluded.crm_opportunity_id, quote_sync.crm_opportunity_id),
            payload_fingerprint = excluded.payload_fingerprint,
            last_synced_at = excluded.last_synced_at",
        params![
            &record.location_id,
            &record.fss_quote_id,
            &record.crm_contact_id,
            &record.crm_opportunity_id,
            &record.payload_fingerprint,
            to_millis(record.last_synced_at),
        ],
    )?;
    Ok(())
}

fn map_quote_row(row: &Row<'_>) -> rusqlite::Result<QuoteSyncRecord> {
    Ok(QuoteSyncRecord {
        location_id: row.get(0)?,
        fss_quote_id: row.get(1)?,
        crm_contact_id: row.get(2)?,
        crm_opportunity_id: row.get(3)?,
        payload_fingerprint: row.get(4)?,
        last_synced_at: from_millis(5, row.get(5)?)?,
    })
}

// ============================================================================
// Tests
// ============================================================================
