//! Shared fixtures for app-level tests

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use fieldbridge_domain::{Config, GatewayConfig, IntegrationConfig};
use fieldbridge_lib::AppContext;
use tempfile::TempDir;
use wiremock::MockServer;

pub const LOCATION: &str = "loc-1";

pub struct TestContext {
    pub ctx: AppContext,
    pub fss: MockServer,
    pub crm: MockServer,
    _temp_dir: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let fss = MockServer::start().await;
        let crm = MockServer::start().await;

        let mut config = Config::default();
        config.database.path = temp_dir.path().join("fieldbridge.db").display().to_string();
        config.database.pool_size = 2;
        config.fss = GatewayConfig { base_url: fss.uri(), ..GatewayConfig::default() };
        config.crm = GatewayConfig { base_url: crm.uri(), ..GatewayConfig::default() };

        let ctx = AppContext::new_with_config(config).expect("failed to create app context");
        Self { ctx, fss, crm, _temp_dir: temp_dir }
    }
}

/// Location with appointment sync and quote polling turned on.
pub fn enabled_config() -> IntegrationConfig {
    let mut config = IntegrationConfig::new(LOCATION, Utc::now());
    config.enabled = true;
    config.sync_appointments = true;
    config.quote_polling_enabled = true;
    config.sync_quotes = true;
    config
}

pub fn at(hour: u32, minute: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, hour, minute, 0).unwrap()
}
