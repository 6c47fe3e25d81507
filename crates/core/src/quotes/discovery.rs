//! Quote discovery strategies
//!
//! The FSS has no change feed, so candidates are found heuristically. Each
//! strategy returns candidate ids plus the cursor to store once the poll
//! completes. The cursor lives on the location's `IntegrationConfig`
//! (`quote_discovery_cursor`), never in process memory.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldbridge_domain::constants::{DEFAULT_ID_RANGE_WINDOW, DEFAULT_RECENT_QUOTES_LIMIT};
use fieldbridge_domain::{FieldBridgeError, IntegrationConfig, Result};
use tracing::debug;

use crate::gateway_ports::{QuoteQuery, QuoteSource};

/// Candidates found by one discovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredQuotes {
    pub quote_ids: Vec<String>,
    /// Cursor to persist when every candidate synced.
    pub next_cursor: Option<String>,
}

#[async_trait]
pub trait QuoteDiscovery: Send + Sync {
    fn name(&self) -> &'static str;

    /// Find candidate quotes for `config.location_id`. Failures surface as
    /// `DiscoveryUnavailable`.
    async fn discover(&self, config: &IntegrationConfig, now: DateTime<Utc>) -> Result<DiscoveredQuotes>;

    /// Cursor to store after syncing. `retry_ids` are the quotes that failed
    /// transiently; while any remain the old cursor is kept so they are found
    /// again on the next poll.
    fn settle_cursor(
        &self,
        config: &IntegrationConfig,
        discovered: &DiscoveredQuotes,
        retry_ids: &[String],
    ) -> Option<String> {
        if retry_ids.is_empty() {
            discovered.next_cursor.clone().or_else(|| config.quote_discovery_cursor.clone())
        } else {
            config.quote_discovery_cursor.clone()
        }
    }
}

// ============================================================================
// Most-recently-modified listing
// ============================================================================

/// Lists quotes modified since the stored cursor (an RFC 3339 timestamp),
/// falling back to the last poll time.
pub struct RecentlyModifiedDiscovery {
    source: Arc<dyn QuoteSource>,
    limit: u32,
}

impl RecentlyModifiedDiscovery {
    pub fn new(source: Arc<dyn QuoteSource>) -> Self {
        Self { source, limit: DEFAULT_RECENT_QUOTES_LIMIT }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.max(1);
        self
    }

    fn modified_since(config: &IntegrationConfig) -> Option<DateTime<Utc>> {
        config
            .quote_discovery_cursor
            .as_deref()
            .and_then(|cursor| DateTime::parse_from_rfc3339(cursor).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .or_else(|| config.last_quote_poll_at.and_then(DateTime::from_timestamp_millis))
    }
}

#[async_trait]
impl QuoteDiscovery for RecentlyModifiedDiscovery {
    fn name(&self) -> &'static str {
        "recently_modified"
    }

    async fn discover(&self, config: &IntegrationConfig, _now: DateTime<Utc>) -> Result<DiscoveredQuotes> {
        let since = Self::modified_since(config);
        let query = QuoteQuery { since_id: None, modified_since: since, limit: self.limit };
        let quotes = self
            .source
            .list_quotes(&config.location_id, &query)
            .await
            .map_err(|e| FieldBridgeError::DiscoveryUnavailable(e.to_string()))?;

        let mut newest = since;
        let mut quote_ids = Vec::new();
        for quote in quotes {
            // quotes without a timestamp cannot be ordered, sync them anyway
            let fresh = match (quote.last_modified, since) {
                (Some(modified), Some(since)) => modified >= since,
                _ => true,
            };
            if !fresh || quote_ids.contains(&quote.id) {
                continue;
            }
            if let Some(modified) = quote.last_modified {
                newest = Some(newest.map_or(modified, |n| n.max(modified)));
            }
            quote_ids.push(quote.id);
        }

        debug!(location_id = %config.location_id, candidates = quote_ids.len(), ?since, "recently modified quotes");
        Ok(DiscoveredQuotes { quote_ids, next_cursor: newest.map(|ts| ts.to_rfc3339()) })
    }
}

// ============================================================================
// Tracked id-range scan
// ============================================================================

/// Scans numeric quote ids above the stored cursor, `window` at a time.
pub struct IdRangeDiscovery {
    source: Arc<dyn QuoteSource>,
    window: u32,
}

impl IdRangeDiscovery {
    pub fn new(source: Arc<dyn QuoteSource>) -> Self {
        Self { source, window: DEFAULT_ID_RANGE_WINDOW }
    }

    pub fn with_window(mut self, window: u32) -> Self {
        self.window = window.max(1);
        self
    }

    fn cursor(config: &IntegrationConfig) -> u64 {
        config
            .quote_discovery_cursor
            .as_deref()
            .and_then(|c| c.trim().parse().ok())
            .unwrap_or(0)
    }
}

#[async_trait]
impl QuoteDiscovery for IdRangeDiscovery {
    fn name(&self) -> &'static str {
        "id_range"
    }

    async fn discover(&self, config: &IntegrationConfig, _now: DateTime<Utc>) -> Result<DiscoveredQuotes> {
        let cursor = Self::cursor(config);
        let query = QuoteQuery {
            since_id: Some(cursor.to_string()),
            modified_since: None,
            limit: self.window,
        };
        let quotes = self
            .source
            .list_quotes(&config.location_id, &query)
            .await
            .map_err(|e| FieldBridgeError::DiscoveryUnavailable(e.to_string()))?;

        let mut ids: Vec<u64> = quotes
            .iter()
            .filter_map(|q| q.numeric_id())
            .filter(|id| *id > cursor)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.truncate(self.window as usize);

        let next_cursor = ids.last().map(u64::to_string);
        debug!(location_id = %config.location_id, cursor, candidates = ids.len(), "id range scanned");
        Ok(DiscoveredQuotes { quote_ids: ids.iter().map(u64::to_string).collect(), next_cursor })
    }

    /// Advance to just below the lowest id awaiting retry, never behind the
    /// stored cursor.
    fn settle_cursor(
        &self,
        config: &IntegrationConfig,
        discovered: &DiscoveredQuotes,
        retry_ids: &[String],
    ) -> Option<String> {
        let current = Self::cursor(config);
        let lowest_failed = retry_ids.iter().filter_map(|id| id.trim().parse::<u64>().ok()).min();

        let settled = match lowest_failed {
            Some(failed) => failed.saturating_sub(1).max(current),
            None => discovered
                .next_cursor
                .as_deref()
                .and_then(|c| c.parse().ok())
                .unwrap_or(current)
                .max(current),
        };
        Some(settled.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fieldbridge_domain::Quote;
    use std::sync::Mutex;

    struct StaticQuotes {
        quotes: Vec<Quote>,
        queries: Mutex<Vec<QuoteQuery>>,
    }

    #[async_trait]
    impl QuoteSource for StaticQuotes {
        async fn list_quotes(&self, _location_id: &str, query: &QuoteQuery) -> Result<Vec<Quote>> {
            self.queries.lock().unwrap().push(query.clone());
            Ok(self.quotes.clone())
        }

        async fn get_quote(&self, _location_id: &str, _quote_id: &str) -> Result<Option<Quote>> {
            Ok(None)
        }
    }

    struct FailingQuotes;

    #[async_trait]
    impl QuoteSource for FailingQuotes {
        async fn list_quotes(&self, _location_id: &str, _query: &QuoteQuery) -> Result<Vec<Quote>> {
            Err(FieldBridgeError::Network("connection reset".into()))
        }

        async fn get_quote(&self, _location_id: &str, _quote_id: &str) -> Result<Option<Quote>> {
            Ok(None)
        }
    }

    fn quote(id: &str, modified: Option<DateTime<Utc>>) -> Quote {
        Quote { id: id.to_string(), last_modified: modified, ..Quote::default() }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    fn config(cursor: Option<&str>) -> IntegrationConfig {
        let mut config = IntegrationConfig::new("loc-1", at(0));
        config.quote_discovery_cursor = cursor.map(str::to_string);
        config
    }

    #[tokio::test]
    async fn recently_modified_filters_and_advances_cursor() {
        let source = Arc::new(StaticQuotes {
            quotes: vec![quote("a", Some(at(7))), quote("b", Some(at(9))), quote("c", Some(at(8)))],
            queries: Mutex::new(Vec::new()),
        });
        let discovery = RecentlyModifiedDiscovery::new(source.clone());
        let config = config(Some(&at(8).to_rfc3339()));

        let found = discovery.discover(&config, at(10)).await.unwrap();
        assert_eq!(found.quote_ids, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(found.next_cursor, Some(at(9).to_rfc3339()));
        assert_eq!(source.queries.lock().unwrap()[0].modified_since, Some(at(8)));
    }

    #[tokio::test]
    async fn recently_modified_falls_back_to_last_poll() {
        let source = Arc::new(StaticQuotes { quotes: vec![], queries: Mutex::new(Vec::new()) });
        let discovery = RecentlyModifiedDiscovery::new(source.clone());
        let mut config = config(None);
        config.last_quote_poll_at = Some(at(6).timestamp_millis());

        let found = discovery.discover(&config, at(10)).await.unwrap();
        assert!(found.quote_ids.is_empty());
        assert_eq!(source.queries.lock().unwrap()[0].modified_since, Some(at(6)));
    }

    #[tokio::test]
    async fn id_range_scans_above_cursor_in_order() {
        let source = Arc::new(StaticQuotes {
            quotes: vec![quote("105", None), quote("98", None), quote("101", None), quote("draft", None)],
            queries: Mutex::new(Vec::new()),
        });
        let discovery = IdRangeDiscovery::new(source.clone()).with_window(10);

        let found = discovery.discover(&config(Some("100")), at(10)).await.unwrap();
        assert_eq!(found.quote_ids, vec!["101".to_string(), "105".to_string()]);
        assert_eq!(found.next_cursor.as_deref(), Some("105"));
        assert_eq!(source.queries.lock().unwrap()[0].since_id.as_deref(), Some("100"));
    }

    #[test]
    fn id_range_cursor_stops_below_first_failure() {
        let discovery = IdRangeDiscovery::new(Arc::new(FailingQuotes));
        let discovered = DiscoveredQuotes {
            quote_ids: vec!["101".into(), "103".into(), "105".into()],
            next_cursor: Some("105".into()),
        };
        let config = config(Some("100"));

        assert_eq!(discovery.settle_cursor(&config, &discovered, &[]), Some("105".into()));
        assert_eq!(
            discovery.settle_cursor(&config, &discovered, &["105".into(), "103".into()]),
            Some("102".into())
        );
        assert_eq!(discovery.settle_cursor(&config, &discovered, &["101".into()]), Some("100".into()));
    }

    #[test]
    fn default_settle_keeps_old_cursor_on_failure() {
        let discovery = RecentlyModifiedDiscovery::new(Arc::new(FailingQuotes));
        let discovered = DiscoveredQuotes { quote_ids: vec!["a".into()], next_cursor: Some("new".into()) };
        let config = config(Some("old"));

        assert_eq!(discovery.settle_cursor(&config, &discovered, &[]), Some("new".into()));
        assert_eq!(discovery.settle_cursor(&config, &discovered, &["a".into()]), Some("old".into()));
    }

    #[tokio::test]
    async fn listing_failure_is_discovery_unavailable() {
        let discovery = IdRangeDiscovery::new(Arc::new(FailingQuotes));
        let err = discovery.discover(&config(None), at(10)).await.unwrap_err();
        assert!(matches!(err, FieldBridgeError::DiscoveryUnavailable(_)));
    }
}
