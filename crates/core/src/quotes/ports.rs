//! Port interface for quote idempotency records

use async_trait::async_trait;
use fieldbridge_domain::{QuoteSyncRecord, Result};

/// Persistence for [`QuoteSyncRecord`], unique on `(location_id, fss_quote_id)`.
#[async_trait]
pub trait QuoteSyncStore: Send + Sync {
    async fn get_quote_record(&self, location_id: &str, fss_quote_id: &str) -> Result<Option<QuoteSyncRecord>>;

    async fn upsert_quote_record(&self, record: &QuoteSyncRecord) -> Result<()>;
}
