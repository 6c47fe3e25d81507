//! Observability: log subscriber setup and in-process scheduler metrics
//!
//! Metric recording never fails the caller. Record methods return
//! `MetricsResult<()>` so a future cardinality or quota check can surface
//! without an API break; today they always succeed.
//!
//! Mutex locks recover from poisoning instead of panicking:
//!
//! ```rust,ignore
//! let guard = match mutex.lock() {
//!     Ok(guard) => guard,
//!     Err(poison_err) => poison_err.into_inner(),
//! };
//! ```

pub mod logging;
pub mod metrics;

pub use logging::init_logging;

/// Metrics error type
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Empty data set - cannot calculate aggregate metric
    #[error("Empty data: cannot calculate {metric}")]
    EmptyData {
        /// Metric name that failed (e.g., "P95", "average")
        metric: &'static str,
    },
}

/// Result type for metrics operations
pub type MetricsResult<T> = Result<T, MetricsError>;
