//! Storage primitives for the reconciliation database
//!
//! Provides an r2d2-backed SQLite pool, the connection wrapper repositories
//! run their statements through, and the storage error type.

pub mod error;
pub mod metrics;
pub mod sqlite;
pub mod types;

pub use error::{StorageError, StorageResult};
pub use metrics::StorageMetrics;
pub use sqlite::{
    apply_connection_pragmas, SqliteConnection, SqlitePool, SqlitePoolConfig, SqliteStatement,
};
pub use types::{HealthStatus, PoolMetrics};
