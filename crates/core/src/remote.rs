//! Bounded remote calls
//!
//! Every gateway call made by an engine goes through [`call_remote`], so a
//! hung request becomes a per-item `RemoteWriteFailed` instead of stalling
//! the batch.

use std::future::Future;
use std::time::Duration;

use fieldbridge_domain::{ExternalSystem, FieldBridgeError, Result};
use tracing::warn;

pub async fn call_remote<T, F>(
    system: ExternalSystem,
    operation: &str,
    timeout: Duration,
    call: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            warn!(%system, operation, error = %err, "remote call failed");
            Err(into_remote_failure(system, err))
        }
        Err(_) => {
            warn!(%system, operation, timeout_secs = timeout.as_secs(), "remote call timed out");
            Err(FieldBridgeError::remote_write(
                system,
                format!("{operation} timed out after {}s", timeout.as_secs()),
            ))
        }
    }
}

fn into_remote_failure(system: ExternalSystem, err: FieldBridgeError) -> FieldBridgeError {
    match err {
        FieldBridgeError::RemoteWriteFailed { .. } => err,
        other => FieldBridgeError::remote_write(system, other.to_string()),
    }
}
