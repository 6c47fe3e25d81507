//! Integration config repository
//!
//! Holds the per-location settings plus the quote poll bookkeeping. The poll
//! timestamp only moves through [`claim_quote_poll`] (a compare-and-set) and
//! [`complete_quote_poll`]; `save_config` leaves both poll columns alone on
//! existing rows so an admin edit cannot rewind them.
//!
//! [`claim_quote_poll`]: IntegrationConfigStore::claim_quote_poll
//! [`complete_quote_poll`]: IntegrationConfigStore::complete_quote_poll

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use fieldbridge_common::storage::{SqliteConnection, StorageError, StorageResult};
use fieldbridge_core::IntegrationConfigStore;
use fieldbridge_domain::{FieldBridgeError, IntegrationConfig, Result as DomainResult};
use rusqlite::types::Type;
use rusqlite::{params, Row};
use tokio::task;

use super::columns::{from_millis, parse_text, to_millis};
use super::manager::DbManager;
use crate::errors::{map_join_error, map_storage_error};

const CONFIG_COLUMNS: &str = "location_id, enabled, sync_appointments, \
     appointment_sync_interval_minutes, appointment_conflict_resolution, default_crm_calendar_id, \
     default_buffer_minutes, quote_polling_enabled, quote_polling_interval_minutes, \
     last_quote_poll_at, quote_discovery_cursor, sync_quotes, create_opportunities, \
     opportunity_pipeline_id, opportunity_stage_id, quote_tags, custom_field_prefix, updated_at";

/// SQLite-backed [`IntegrationConfigStore`]
pub struct SqliteIntegrationConfigRepository {
    db: Arc<DbManager>,
}

impl SqliteIntegrationConfigRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IntegrationConfigStore for SqliteIntegrationConfigRepository {
    async fn get_config(&self, location_id: &str) -> DomainResult<Option<IntegrationConfig>> {
        let db = Arc::clone(&self.db);
        let location_id = location_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<IntegrationConfig>> {
            let conn = db.get_connection()?;
            query_config(&conn, &location_id).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_configs(&self) -> DomainResult<Vec<IntegrationConfig>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<IntegrationConfig>> {
            let conn = db.get_connection()?;
            query_configs(&conn).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn save_config(&self, config: &IntegrationConfig) -> DomainResult<()> {
        if config.location_id.trim().is_empty() {
            return Err(FieldBridgeError::InvalidInput("location id must not be empty".into()));
        }
        let tags = serde_json::to_string(&config.quote_tags)
            .map_err(|e| FieldBridgeError::InvalidInput(format!("quote tags: {e}")))?;

        let db = Arc::clone(&self.db);
        let config = config.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            upsert_config(&conn, &config, &tags).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn claim_quote_poll(
        &self,
        location_id: &str,
        expected: Option<i64>,
        now_ms: i64,
    ) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let location_id = location_id.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            compare_and_set_poll(&conn, &location_id, expected, now_ms).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn complete_quote_poll(
        &self,
        location_id: &str,
        polled_at_ms: i64,
        cursor: Option<&str>,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let location_id = location_id.to_string();
        let cursor = cursor.map(str::to_string);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let updated = complete_poll(&conn, &location_id, polled_at_ms, cursor.as_deref())
                .map_err(map_storage_error)?;
            if updated {
                Ok(())
            } else {
                Err(FieldBridgeError::NotFound(format!("integration config for {location_id}")))
            }
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn query_config(
    conn: &SqliteConnection,
    location_id: &str,
) -> StorageResult<Option<IntegrationConfig>> {
    let sql = format!("SELECT {CONFIG_COLUMNS} FROM integration_configs WHERE location_id = ?1");

    match conn.query_row(&sql, params![location_id], map_config_row) {
        Ok(config) => Ok(Some(config)),
        Err(StorageError::Rusqlite(rusqlite::Error::QueryReturnedNoRows)) => Ok(None),
        Err(err) => Err(err),
    }
}

fn query_configs(conn: &SqliteConnection) -> StorageResult<Vec<IntegrationConfig>> {
    let sql = format!("SELECT {CONFIG_COLUMNS} FROM integration_configs ORDER BY location_id ASC");

    let mut stmt = conn.prepare(&sql)?;
    stmt.query_map(params![], map_config_row)
}

fn upsert_config(conn: &SqliteConnection, config: &IntegrationConfig, tags: &str) -> StorageResult<()> {
    let sql = format!(
        "INSERT INTO integration_configs ({CONFIG_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
         ON CONFLICT(location_id) DO UPDATE SET
            enabled = excluded.enabled,
            sync_appointments = excluded.sync_appointments,
            appointment_sync_interval_minutes = excluded.appointment_sync_interval_minutes,
            appointment_conflict_resolution = excluded.appointment_conflict_resolution,
            default_crm_calendar_id = excluded.default_crm_calendar_id,
            default_buffer_minutes = excluded.default_buffer_minutes,
            quote_polling_enabled = excluded.quote_polling_enabled,
            quote_polling_interval_minutes = excluded.quote_polling_interval_minutes,
            sync_quotes = excluded.sync_quotes,
            create_opportunities = excluded.create_opportunities,
            opportunity_pipeline_id = excluded.opportunity_pipeline_id,
            opportunity_stage_id = excluded.opportunity_stage_id,
            quote_tags = excluded.quote_tags,
            custom_field_prefix = excluded.custom_field_prefix,
            updated_at = excluded.updated_at"
    );

    conn.execute(
        &sql,
        params![
            &config.location_id,
            config.enabled,
            config.sync_appointments,
            config.appointment_sync_interval_minutes,
            config.appointment_conflict_resolution.as_str(),
            &config.default_crm_calendar_id,
            config.default_buffer_minutes,
            config.quote_polling_enabled,
            config.quote_polling_interval_minutes,
            config.last_quote_poll_at,
            &config.quote_discovery_cursor,
            config.sync_quotes,
            config.create_opportunities,
            &config.opportunity_pipeline_id,
            &config.opportunity_stage_id,
            tags,
            &config.custom_field_prefix,
            to_millis(config.updated_at),
        ],
    )?;
    Ok(())
}

/// `IS` rather than `=` so a never-polled location (NULL) can be claimed.
fn compare_and_set_poll(
    conn: &SqliteConnection,
    location_id: &str,
    expected: Option<i64>,
    now_ms: i64,
) -> StorageResult<bool> {
    let changed = conn.execute(
        "UPDATE integration_configs SET last_quote_poll_at = ?1
         WHERE location_id = ?2 AND last_quote_poll_at IS ?3",
        params![now_ms, location_id, expected],
    )?;
    Ok(changed == 1)
}

fn complete_poll(
    conn: &SqliteConnection,
    location_id: &str,
    polled_at_ms: i64,
    cursor: Option<&str>,
) -> StorageResult<bool> {
    let changed = conn.execute(
        "UPDATE integration_configs
         SET last_quote_poll_at = ?1,
             quote_discovery_cursor = COALESCE(?2, quote_discovery_cursor),
             updated_at = ?3
         WHERE location_id = ?4",
        params![polled_at_ms, cursor, to_millis(Utc::now()), location_id],
    )?;
    Ok(changed > 0)
}

fn map_config_row(row: &Row<'_>) -> rusqlite::Result<IntegrationConfig> {
    let tags: String = row.get(15)?;
    let quote_tags = serde_json::from_str(&tags)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(15, Type::Text, Box::new(e)))?;

    Ok(IntegrationConfig {
        location_id: row.get(0)?,
        enabled: row.get(1)?,
        sync_appointments: row.get(2)?,
        appointment_sync_interval_minutes: row.get(3)?,
        appointment_conflict_resolution: parse_text(4, &row.get::<_, String>(4)?)?,
        default_crm_calendar_id: row.get(5)?,
        default_buffer_minutes: row.get(6)?,
        quote_polling_enabled: row.get(7)?,
        quote_polling_interval_minutes: row.get(8)?,
        last_quote_poll_at: row.get(9)?,
        quote_discovery_cursor: row.get(10)?,
        sync_quotes: row.get(11)?,
        create_opportunities: row.get(12)?,
        opportunity_pipeline_id: row.get(13)?,
        opportunity_stage_id: row.get(14)?,
        quote_tags,
        custom_field_prefix: row.get(16)?,
        updated_at: from_millis(17, row.get(17)?)?,
    })
}

// ============================================================================
// Tests
// ============================================================================
