//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Attempt to build the whole config from `FIELDBRIDGE_*` variables
//! 2. If a required variable is missing, fall back to a config file
//! 3. Probe several paths for the file; JSON and TOML are both accepted
//!
//! API keys are read from the environment in both cases, so they can stay
//! out of config files.
//!
//! ## Environment Variables
//! Required: `FIELDBRIDGE_DB_PATH`, `FIELDBRIDGE_FSS_BASE_URL`,
//! `FIELDBRIDGE_CRM_BASE_URL`.
//!
//! Optional: `FIELDBRIDGE_DB_POOL_SIZE`, `FIELDBRIDGE_FSS_API_KEY`,
//! `FIELDBRIDGE_CRM_API_KEY`, `FIELDBRIDGE_GATEWAY_TIMEOUT_SECS`,
//! `FIELDBRIDGE_LOOKBACK_DAYS`, `FIELDBRIDGE_LOOKAHEAD_DAYS`,
//! `FIELDBRIDGE_MAX_CONCURRENCY`, `FIELDBRIDGE_APPOINTMENT_CRON`,
//! `FIELDBRIDGE_QUOTE_CRON`, `FIELDBRIDGE_JOB_TIMEOUT_SECS`,
//! `FIELDBRIDGE_QUOTE_DISCOVERY` (`recently_modified`, the default, or
//! `id_range`, which only finds new quotes),
//! `FIELDBRIDGE_LOG_LEVEL`, `FIELDBRIDGE_LOG_FORMAT` (`pretty`/`json`).
//!
//! ## File Locations
//! Probed in order, first hit wins:
//! 1. `./fieldbridge.{json,toml}` then `./config.{json,toml}`
//! 2. The same names one and two directories up
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use fieldbridge_domain::{Config, FieldBridgeError, LogFormat, QuoteDiscoveryStrategy, Result};

const CONFIG_FILE_NAMES: [&str; 4] = ["fieldbridge.json", "fieldbridge.toml", "config.json", "config.toml"];
const PROBE_PREFIXES: [&str; 3] = [".", "..", "../.."];

/// Load configuration, environment first, then file.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Build the config from `FIELDBRIDGE_*` variables over the defaults.
///
/// # Errors
/// `FieldBridgeError::Config` when a required variable is missing or a
/// value does not parse.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.database.path = env_var("FIELDBRIDGE_DB_PATH")?;
    config.fss.base_url = env_var("FIELDBRIDGE_FSS_BASE_URL")?;
    config.crm.base_url = env_var("FIELDBRIDGE_CRM_BASE_URL")?;

    if let Some(pool_size) = env_parse("FIELDBRIDGE_DB_POOL_SIZE")? {
        config.database.pool_size = pool_size;
    }
    if let Some(timeout) = env_parse("FIELDBRIDGE_GATEWAY_TIMEOUT_SECS")? {
        config.fss.timeout_secs = timeout;
        config.crm.timeout_secs = timeout;
    }
    if let Some(days) = env_parse("FIELDBRIDGE_LOOKBACK_DAYS")? {
        config.sync.lookback_days = days;
    }
    if let Some(days) = env_parse("FIELDBRIDGE_LOOKAHEAD_DAYS")? {
        config.sync.lookahead_days = days;
    }
    if let Some(concurrency) = env_parse("FIELDBRIDGE_MAX_CONCURRENCY")? {
        config.sync.max_concurrency = concurrency;
    }
    if let Some(timeout) = env_parse("FIELDBRIDGE_JOB_TIMEOUT_SECS")? {
        config.sync.job_timeout_secs = timeout;
    }
    if let Ok(cron) = std::env::var("FIELDBRIDGE_APPOINTMENT_CRON") {
        config.sync.appointment_cron = cron;
    }
    if let Ok(cron) = std::env::var("FIELDBRIDGE_QUOTE_CRON") {
        config.sync.quote_cron = cron;
    }
    if let Ok(strategy) = std::env::var("FIELDBRIDGE_QUOTE_DISCOVERY") {
        config.sync.quote_discovery = QuoteDiscoveryStrategy::from_str(&strategy)
            .map_err(|e| FieldBridgeError::Config(format!("Invalid quote discovery strategy: {e}")))?;
    }
    if let Ok(level) = std::env::var("FIELDBRIDGE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(format) = std::env::var("FIELDBRIDGE_LOG_FORMAT") {
        config.logging.format = LogFormat::from_str(&format)
            .map_err(|e| FieldBridgeError::Config(format!("Invalid log format: {e}")))?;
    }

    apply_secret_overrides(&mut config);
    Ok(config)
}

/// Load configuration from a file. With `path = None` the standard
/// locations are probed.
///
/// # Errors
/// `FieldBridgeError::Config` when the file is missing, unreadable or does
/// not parse.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(FieldBridgeError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            FieldBridgeError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| FieldBridgeError::Config(format!("Failed to read config file: {e}")))?;

    let mut config = parse_config(&contents, &config_path)?;
    apply_secret_overrides(&mut config);
    Ok(config)
}

/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| FieldBridgeError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| FieldBridgeError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(FieldBridgeError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| {
            PROBE_PREFIXES
                .iter()
                .flat_map(move |prefix| CONFIG_FILE_NAMES.iter().map(move |name| root.join(prefix).join(name)))
        })
        .find(|candidate| candidate.exists())
}

fn apply_secret_overrides(config: &mut Config) {
    if let Ok(key) = std::env::var("FIELDBRIDGE_FSS_API_KEY") {
        config.fss.api_key = Some(key);
    }
    if let Ok(key) = std::env::var("FIELDBRIDGE_CRM_API_KEY") {
        config.crm.api_key = Some(key);
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| FieldBridgeError::Config(format!("Missing required environment variable: {key}")))
}

/// `Ok(None)` when unset, `Err` when set but unparseable.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| FieldBridgeError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::{Builder, TempDir};

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ALL_VARS: [&str; 17] = [
        "FIELDBRIDGE_DB_PATH",
        "FIELDBRIDGE_FSS_BASE_URL",
        "FIELDBRIDGE_CRM_BASE_URL",
        "FIELDBRIDGE_DB_POOL_SIZE",
        "FIELDBRIDGE_FSS_API_KEY",
        "FIELDBRIDGE_CRM_API_KEY",
        "FIELDBRIDGE_GATEWAY_TIMEOUT_SECS",
        "FIELDBRIDGE_LOOKBACK_DAYS",
        "FIELDBRIDGE_LOOKAHEAD_DAYS",
        "FIELDBRIDGE_MAX_CONCURRENCY",
        "FIELDBRIDGE_APPOINTMENT_CRON",
        "FIELDBRIDGE_QUOTE_CRON",
        "FIELDBRIDGE_JOB_TIMEOUT_SECS",
        "FIELDBRIDGE_QUOTE_DISCOVERY",
        "FIELDBRIDGE_LOG_LEVEL",
        "FIELDBRIDGE_LOG_FORMAT",
        "RUST_LOG",
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    fn set_required() {
        std::env::set_var("FIELDBRIDGE_DB_PATH", "/tmp/fieldbridge.db");
        std::env::set_var("FIELDBRIDGE_FSS_BASE_URL", "https://fss.example/api");
        std::env::set_var("FIELDBRIDGE_CRM_BASE_URL", "https://crm.example");
    }

    fn write_config(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("config file created");
        file.write_all(contents.as_bytes()).expect("config written");
        path
    }

    #[test]
    fn env_with_required_vars_uses_defaults_elsewhere() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_required();
        std::env::set_var("FIELDBRIDGE_CRM_API_KEY", "crm-secret");
        std::env::set_var("FIELDBRIDGE_LOG_FORMAT", "JSON");
        std::env::set_var("FIELDBRIDGE_LOOKAHEAD_DAYS", "30");
        std::env::set_var("FIELDBRIDGE_QUOTE_DISCOVERY", "id_range");

        let config = load_from_env().expect("env config");
        assert_eq!(config.database.path, "/tmp/fieldbridge.db");
        assert_eq!(config.fss.base_url, "https://fss.example/api");
        assert_eq!(config.crm.api_key.as_deref(), Some("crm-secret"));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.sync.lookahead_days, 30);
        assert_eq!(config.sync.quote_discovery, QuoteDiscoveryStrategy::IdRange);
        assert_eq!(config.sync.lookback_days, fieldbridge_domain::constants::DEFAULT_LOOKBACK_DAYS);

        clear_env();
    }

    #[test]
    fn env_missing_required_var_is_config_error() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("FIELDBRIDGE_DB_PATH", "/tmp/fieldbridge.db");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, FieldBridgeError::Config(ref m) if m.contains("FIELDBRIDGE_FSS_BASE_URL")));
        clear_env();
    }

    #[test]
    fn env_invalid_number_is_config_error() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_required();
        std::env::set_var("FIELDBRIDGE_DB_POOL_SIZE", "many");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, FieldBridgeError::Config(ref m) if m.contains("FIELDBRIDGE_DB_POOL_SIZE")));
        clear_env();
    }

    #[test]
    fn toml_file_with_partial_sections() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(
            &dir,
            "fieldbridge.toml",
            r#"
[database]
path = "data/fieldbridge.db"

[fss]
base_url = "https://fss.example/api"
page_size = 25

[crm]
base_url = "https://crm.example"

[sync]
quote_cron = "0 */2 * * * *"
"#,
        );

        let config = load_from_file(Some(path)).expect("toml config");
        assert_eq!(config.database.path, "data/fieldbridge.db");
        assert_eq!(config.fss.page_size, 25);
        assert_eq!(config.sync.quote_cron, "0 */2 * * * *");
        assert_eq!(config.sync.appointment_cron, fieldbridge_domain::constants::DEFAULT_APPOINTMENT_CRON);
        assert!(config.crm.api_key.is_none());
    }

    #[test]
    fn file_config_takes_api_keys_from_env() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("FIELDBRIDGE_FSS_API_KEY", "fss-secret");
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(&dir, "config.json", r#"{"fss": {"base_url": "https://fss.example"}}"#);

        let config = load_from_file(Some(path)).expect("json config");
        assert_eq!(config.fss.api_key.as_deref(), Some("fss-secret"));
        clear_env();
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = load_from_file(Some(PathBuf::from("/nonexistent/fieldbridge.toml"))).unwrap_err();
        assert!(matches!(err, FieldBridgeError::Config(_)));
    }

    #[test]
    fn invalid_json_is_config_error() {
        let file = Builder::new().suffix(".json").tempfile().expect("temp file");
        std::fs::write(file.path(), "{ not json").expect("written");

        let err = load_from_file(Some(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, FieldBridgeError::Config(ref m) if m.contains("JSON")));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = parse_config("path = 1", Path::new("fieldbridge.yaml")).unwrap_err();
        assert!(matches!(err, FieldBridgeError::Config(ref m) if m.contains("yaml")));
    }
}
