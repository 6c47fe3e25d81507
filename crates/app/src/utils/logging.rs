use std::time::{Duration, Instant};

use fieldbridge_domain::{FieldBridgeError, Result};
use tracing::{info, warn};

/// Log the outcome of a command execution with structured fields.
///
/// `command` must be a stable identifier such as `"appointments::sync_all"`;
/// never forward location ids or payload values through it.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, error: Option<&FieldBridgeError>) {
    let duration_ms = elapsed.as_millis() as u64;

    match error {
        None => info!(command, duration_ms, "command_execution_success"),
        Some(err) => warn!(
            command,
            duration_ms,
            error_type = error_label(err),
            error = %err,
            "command_execution_failure"
        ),
    }
}

/// Log a finished command and hand its result back.
pub fn finish_command<T>(command: &str, start: Instant, result: Result<T>) -> Result<T> {
    log_command_execution(command, start.elapsed(), result.as_ref().err());
    result
}

/// Convert a `FieldBridgeError` into a stable label suitable for metrics/logging.
#[inline]
pub fn error_label(error: &FieldBridgeError) -> &'static str {
    match error {
        FieldBridgeError::Database(_) => "database",
        FieldBridgeError::Config(_) => "config",
        FieldBridgeError::Network(_) => "network",
        FieldBridgeError::Auth(_) => "auth",
        FieldBridgeError::NotFound(_) => "not_found",
        FieldBridgeError::InvalidInput(_) => "invalid_input",
        FieldBridgeError::Internal(_) => "internal",
        FieldBridgeError::InvalidTimeRange { .. } => "invalid_time_range",
        FieldBridgeError::TeamMappingMissing { .. } => "team_mapping_missing",
        FieldBridgeError::RemoteWriteFailed { .. } => "remote_write_failed",
        FieldBridgeError::DiscoveryUnavailable(_) => "discovery_unavailable",
        FieldBridgeError::Timeout { .. } => "timeout",
    }
}
