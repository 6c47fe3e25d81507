//! Error vocabulary shared by the FieldBridge crates.
//!
//! [`ErrorClassification`] is what the schedulers and command helpers look
//! at: whether the next tick may succeed, and how loudly to log. Storage,
//! infra and domain errors all implement it. [`CommonError`] covers the
//! failures that are not owned by a single layer.

use std::fmt;
use std::time::Duration;

pub type CommonResult<T> = Result<T, CommonError>;

/// Failures shared across layers.
#[derive(Debug, Clone, PartialEq)]
pub enum CommonError {
    Config { message: String, field: Option<String> },

    /// Payload could not be encoded or decoded.
    Serialization { message: String, format: &'static str },

    Timeout { operation: String, duration: Duration },

    /// A call to the FSS or CRM failed before the caller could classify it.
    Remote { system: String, message: String, retryable: bool },

    Storage { message: String, operation: Option<String> },

    Internal { message: String },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message, field: Some(field) } => {
                write!(f, "Configuration error in '{field}': {message}")
            }
            Self::Config { message, field: None } => write!(f, "Configuration error: {message}"),
            Self::Serialization { message, format } => write!(f, "{format} error: {message}"),
            Self::Timeout { operation, duration } => {
                write!(f, "'{operation}' timed out after {}s", duration.as_secs())
            }
            Self::Remote { system, message, .. } => write!(f, "{system} call failed: {message}"),
            Self::Storage { message, operation: Some(op) } => {
                write!(f, "Storage error during '{op}': {message}")
            }
            Self::Storage { message, operation: None } => write!(f, "Storage error: {message}"),
            Self::Internal { message } => write!(f, "Internal error: {message}"),
        }
    }
}

impl std::error::Error for CommonError {}

impl CommonError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into(), field: None }
    }

    pub fn config_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config { message: message.into(), field: Some(field.into()) }
    }

    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout { operation: operation.into(), duration }
    }

    pub fn remote(system: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        Self::Remote { system: system.into(), message: message.into(), retryable }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Remote { retryable, .. } => *retryable,
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Timeout { .. } => ErrorSeverity::Warning,
            Self::Remote { retryable: true, .. } => ErrorSeverity::Warning,
            Self::Internal { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization { message: err.to_string(), format: "JSON" }
    }
}

/// Classification implemented by every error type in the workspace.
pub trait ErrorClassification {
    /// The next scheduled pass may succeed without operator action.
    fn is_retryable(&self) -> bool;

    fn severity(&self) -> ErrorSeverity;

    /// Data integrity or invariant violations.
    fn is_critical(&self) -> bool;

    /// Suggested delay before the next attempt, when the remote side sent one.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Error severity levels for logging and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_retryability_follows_flag() {
        assert!(CommonError::remote("crm", "503", true).is_retryable());
        assert!(!CommonError::remote("crm", "422", false).is_retryable());
        assert_eq!(CommonError::remote("crm", "503", true).severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn timeout_is_retryable_warning() {
        let err = CommonError::timeout("list_appointments", Duration::from_secs(10));
        assert!(err.is_retryable());
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert_eq!(err.to_string(), "'list_appointments' timed out after 10s");
    }

    #[test]
    fn internal_is_critical() {
        let err = CommonError::internal("record without ids");
        assert!(err.is_critical());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.retry_after().is_none());
    }

    #[test]
    fn config_field_display() {
        let err = CommonError::config_field("crm.base_url", "is required");
        assert_eq!(err.to_string(), "Configuration error in 'crm.base_url': is required");
    }

    #[test]
    fn json_errors_become_serialization() {
        let err: CommonError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, CommonError::Serialization { format: "JSON", .. }));
    }

    #[test]
    fn severity_ordering() {
        assert!(ErrorSeverity::Critical > ErrorSeverity::Error);
        assert!(ErrorSeverity::Warning > ErrorSeverity::Info);
    }
}
