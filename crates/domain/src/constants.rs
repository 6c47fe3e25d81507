//! Application constants
//!
//! Defaults shared by the engines, the configuration loader and the schema.

pub const MS_PER_MINUTE: i64 = 60_000;

// Appointment reconciliation window
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;
pub const DEFAULT_LOOKAHEAD_DAYS: u32 = 60;

// Gateway calls
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 25; // stays under typical serverless limits
pub const DEFAULT_GATEWAY_MAX_ATTEMPTS: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

// Per-location integration defaults
pub const DEFAULT_APPOINTMENT_SYNC_INTERVAL_MINUTES: u32 = 15;
pub const DEFAULT_QUOTE_POLLING_INTERVAL_MINUTES: u32 = 15;
pub const DEFAULT_CUSTOM_FIELD_PREFIX: &str = "fss_";

// Quote discovery
pub const DEFAULT_ID_RANGE_WINDOW: u32 = 50;
pub const DEFAULT_RECENT_QUOTES_LIMIT: u32 = 100;

// Schedulers
pub const DEFAULT_APPOINTMENT_CRON: &str = "0 */15 * * * *";
pub const DEFAULT_QUOTE_CRON: &str = "0 */5 * * * *";
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 600;

// Storage
pub const DEFAULT_DATABASE_PATH: &str = "fieldbridge.db";
pub const DEFAULT_POOL_SIZE: u32 = 8;
