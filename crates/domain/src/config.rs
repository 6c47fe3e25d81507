//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_APPOINTMENT_CRON, DEFAULT_DATABASE_PATH, DEFAULT_GATEWAY_MAX_ATTEMPTS,
    DEFAULT_JOB_TIMEOUT_SECS, DEFAULT_LOOKAHEAD_DAYS, DEFAULT_LOOKBACK_DAYS,
    DEFAULT_MAX_CONCURRENCY, DEFAULT_PAGE_SIZE, DEFAULT_POOL_SIZE, DEFAULT_QUOTE_CRON,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub fss: GatewayConfig,
    #[serde(default)]
    pub crm: GatewayConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: DEFAULT_DATABASE_PATH.to_string(), pool_size: DEFAULT_POOL_SIZE }
    }
}

/// One external platform's REST endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Attempts per HTTP request. Reconciliation does not retry inside a
    /// pass, so this stays at 1 unless a gateway is known to flap.
    pub max_attempts: u32,
    pub page_size: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_attempts: DEFAULT_GATEWAY_MAX_ATTEMPTS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Reconciliation engine and scheduler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub lookback_days: u32,
    pub lookahead_days: u32,
    pub request_timeout_secs: u64,
    pub max_concurrency: usize,
    pub appointment_cron: String,
    pub quote_cron: String,
    pub job_timeout_secs: u64,
    pub quote_discovery: QuoteDiscoveryStrategy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            appointment_cron: DEFAULT_APPOINTMENT_CRON.to_string(),
            quote_cron: DEFAULT_QUOTE_CRON.to_string(),
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            quote_discovery: QuoteDiscoveryStrategy::default(),
        }
    }
}

/// How the quote poller finds candidate quotes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteDiscoveryStrategy {
    /// Scan ids above the stored cursor. Works without modification filters
    /// but only finds new quotes; edits to quotes below the cursor are not
    /// picked up.
    IdRange,
    /// List quotes modified since the previous poll, covering new and
    /// changed quotes.
    #[default]
    RecentlyModified,
}

crate::impl_domain_status_conversions!(QuoteDiscoveryStrategy {
    IdRange => "id_range",
    RecentlyModified => "recently_modified",
});

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

crate::impl_domain_status_conversions!(LogFormat {
    Pretty => "pretty",
    Json => "json",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Pretty }
    }
}
