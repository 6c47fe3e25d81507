//! Conversions from external infrastructure errors into domain errors.

use fieldbridge_common::storage::StorageError;
use fieldbridge_common::{ErrorClassification, ErrorSeverity};
use fieldbridge_domain::FieldBridgeError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub FieldBridgeError);

impl From<InfraError> for FieldBridgeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<FieldBridgeError> for InfraError {
    fn from(value: FieldBridgeError) -> Self {
        InfraError(value)
    }
}

impl std::fmt::Display for InfraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for InfraError {}

impl ErrorClassification for InfraError {
    fn is_retryable(&self) -> bool {
        self.0.kind().is_retryable()
    }

    fn severity(&self) -> ErrorSeverity {
        match &self.0 {
            FieldBridgeError::NotFound(_) => ErrorSeverity::Info,
            FieldBridgeError::Network(_)
            | FieldBridgeError::Timeout { .. }
            | FieldBridgeError::RemoteWriteFailed { .. }
            | FieldBridgeError::DiscoveryUnavailable(_) => ErrorSeverity::Warning,
            FieldBridgeError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self.0, FieldBridgeError::Internal(_))
    }

    fn retry_after(&self) -> Option<std::time::Duration> {
        None
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoFieldBridgeError {
    fn into_fieldbridge(self) -> FieldBridgeError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → FieldBridgeError */
/* -------------------------------------------------------------------------- */

impl IntoFieldBridgeError for SqlError {
    fn into_fieldbridge(self) -> FieldBridgeError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => FieldBridgeError::Database("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        FieldBridgeError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        FieldBridgeError::Database(format!("unique constraint violation: {message}"))
                    }
                    (ErrorCode::ConstraintViolation, 275) => {
                        FieldBridgeError::Database(format!("check constraint violation: {message}"))
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        FieldBridgeError::Database("foreign key constraint violation".into())
                    }
                    _ => FieldBridgeError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => FieldBridgeError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                FieldBridgeError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                FieldBridgeError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => FieldBridgeError::Database("invalid UTF-8 returned from sqlite".into()),
            RE::InvalidParameterName(parameter_name) => {
                FieldBridgeError::Database(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => FieldBridgeError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            RE::InvalidQuery => FieldBridgeError::Database("invalid SQL query".into()),
            other => FieldBridgeError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_fieldbridge())
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError → FieldBridgeError */
/* -------------------------------------------------------------------------- */

impl IntoFieldBridgeError for StorageError {
    fn into_fieldbridge(self) -> FieldBridgeError {
        match self {
            StorageError::Rusqlite(sql_err) => sql_err.into_fieldbridge(),
            StorageError::Timeout(seconds) => {
                FieldBridgeError::Database(format!("database timeout after {seconds}s"))
            }
            StorageError::Connection(message)
            | StorageError::Query(message)
            | StorageError::Migration(message)
            | StorageError::InvalidConfig(message) => FieldBridgeError::Database(message),
            StorageError::SchemaVersionMismatch { expected, found } => FieldBridgeError::Database(
                format!("schema version mismatch (expected {expected}, found {found})"),
            ),
            StorageError::Common(common_err) => FieldBridgeError::Database(common_err.to_string()),
            StorageError::Io(io_err) => FieldBridgeError::Database(io_err.to_string()),
            StorageError::R2d2(r2d2_err) => FieldBridgeError::Database(r2d2_err.to_string()),
            StorageError::SerdeJson(json_err) => FieldBridgeError::Database(json_err.to_string()),
        }
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(value.into_fieldbridge())
    }
}

/// Repository helper: storage failures become `FieldBridgeError::Database`.
pub fn map_storage_error(err: StorageError) -> FieldBridgeError {
    InfraError::from(err).into()
}

/// Repository helper for a panicked or cancelled `spawn_blocking` task.
pub fn map_join_error(err: JoinError) -> FieldBridgeError {
    if err.is_cancelled() {
        FieldBridgeError::Internal("blocking database task was cancelled".into())
    } else {
        FieldBridgeError::Internal(format!("blocking database task panicked: {err}"))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → FieldBridgeError */
/* -------------------------------------------------------------------------- */

impl IntoFieldBridgeError for HttpError {
    fn into_fieldbridge(self) -> FieldBridgeError {
        if self.is_timeout() {
            return FieldBridgeError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return FieldBridgeError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            return status_error(status.as_u16(), status.canonical_reason().unwrap_or("unknown status"));
        }

        if self.is_decode() {
            return FieldBridgeError::InvalidInput(format!("unexpected response body: {self}"));
        }

        FieldBridgeError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_fieldbridge())
    }
}

/// HTTP status → domain error, shared by the client and adapters.
pub fn status_error(code: u16, detail: &str) -> FieldBridgeError {
    let message = format!("HTTP {code} {detail}");
    match code {
        401 | 403 => FieldBridgeError::Auth(message),
        404 => FieldBridgeError::NotFound(message),
        429 => FieldBridgeError::Network(message),
        400..=499 => FieldBridgeError::InvalidInput(message),
        _ => FieldBridgeError::Network(message),
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use fieldbridge_domain::SyncErrorKind;
    use reqwest::{Client, StatusCode};
    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use rusqlite::Error as SqlError;
    use tokio::runtime::Runtime;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn sqlite_busy_maps_to_database_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        let mapped: FieldBridgeError = InfraError::from(err).into();
        match mapped {
            FieldBridgeError::Database(msg) => {
                assert!(msg.contains("busy") || msg.contains("locked"));
            }
            other => panic!("expected database error, got {:?}", other),
        }
    }

    #[test]
    fn unique_violation_is_labelled() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::ConstraintViolation, extended_code: 2067 },
            Some("UNIQUE constraint failed: appointment_syncs.crm_appointment_id".into()),
        );
        let mapped = map_storage_error(StorageError::Rusqlite(err));
        match mapped {
            FieldBridgeError::Database(msg) => assert!(msg.starts_with("unique constraint violation")),
            other => panic!("expected database error, got {:?}", other),
        }
    }

    #[test]
    fn storage_timeout_maps_to_database_error() {
        let mapped = map_storage_error(StorageError::Timeout(5));
        assert_eq!(mapped, FieldBridgeError::Database("database timeout after 5s".into()));
        assert_eq!(mapped.kind(), SyncErrorKind::Storage);
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert!(matches!(status_error(403, "Forbidden"), FieldBridgeError::Auth(_)));
        assert!(matches!(status_error(404, "Not Found"), FieldBridgeError::NotFound(_)));
        assert!(matches!(status_error(422, "Unprocessable"), FieldBridgeError::InvalidInput(_)));
        assert!(matches!(status_error(429, "Too Many Requests"), FieldBridgeError::Network(_)));
        assert!(matches!(status_error(502, "Bad Gateway"), FieldBridgeError::Network(_)));
    }

    #[test]
    fn network_errors_are_retryable() {
        let err = InfraError(FieldBridgeError::Network("reset".into()));
        assert!(err.is_retryable());
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert!(!InfraError(FieldBridgeError::Auth("401".into())).is_retryable());
    }

    #[test]
    fn http_status_401_maps_to_auth_error() {
        Runtime::new().unwrap().block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(StatusCode::UNAUTHORIZED))
                .mount(&server)
                .await;

            let client = Client::builder().no_proxy().build().unwrap();
            let error =
                client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

            let mapped: FieldBridgeError = InfraError::from(error).into();
            match mapped {
                FieldBridgeError::Auth(msg) => assert!(msg.contains("401")),
                other => panic!("expected auth error, got {:?}", other),
            }
        });
    }
}
