//! Global tracing subscriber
//!
//! `RUST_LOG` wins over the configured level so operators can raise
//! verbosity for one module without touching the config file.

use fieldbridge_domain::{FieldBridgeError, LogFormat, LoggingConfig, Result};
use tracing_subscriber::EnvFilter;

/// Build the filter from `RUST_LOG`, falling back to `config.level`.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| FieldBridgeError::Config(format!("invalid log level '{}': {e}", config.level)))
}

/// Install the process-wide subscriber. Call once, before anything logs.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = match config.format {
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    installed.map_err(|e| FieldBridgeError::Config(format!("logging already initialised: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unparseable_level() {
        std::env::remove_var("RUST_LOG");
        let config = LoggingConfig { level: "fieldbridge=[".into(), format: LogFormat::Pretty };
        assert!(matches!(env_filter(&config), Err(FieldBridgeError::Config(_))));
    }

    #[test]
    fn accepts_directive_lists() {
        std::env::remove_var("RUST_LOG");
        let config = LoggingConfig { level: "info,fieldbridge_core=debug".into(), format: LogFormat::Json };
        assert!(env_filter(&config).is_ok());
    }
}
