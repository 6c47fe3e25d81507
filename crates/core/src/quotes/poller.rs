//! Quote poller
//!
//! Walks every location with quote polling turned on, throttles on
//! `last_quote_poll_at`, claims the poll with a conditional write and then
//! discovers and syncs candidate quotes. The completion write always runs,
//! so a location that keeps failing is retried at the polling interval and
//! not on every trigger.

use std::sync::Arc;

use fieldbridge_domain::constants::DEFAULT_MAX_CONCURRENCY;
use fieldbridge_domain::{IntegrationConfig, LocationPollResult, Result, SyncErrorKind};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use super::discovery::QuoteDiscovery;
use super::service::QuoteSyncService;
use crate::appointments::ports::IntegrationConfigStore;
use crate::clock::{Clock, SystemClock};

pub struct QuotePoller {
    configs: Arc<dyn IntegrationConfigStore>,
    discovery: Arc<dyn QuoteDiscovery>,
    sync: QuoteSyncService,
    clock: Arc<dyn Clock>,
    max_concurrency: usize,
}

impl QuotePoller {
    pub fn new(
        configs: Arc<dyn IntegrationConfigStore>,
        discovery: Arc<dyn QuoteDiscovery>,
        sync: QuoteSyncService,
    ) -> Self {
        Self {
            configs,
            discovery,
            sync,
            clock: Arc::new(SystemClock),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// One result per location with quote polling enabled. Only a failure to
    /// list the configs is returned as `Err`.
    #[instrument(skip(self))]
    pub async fn poll_due_locations(&self) -> Result<Vec<LocationPollResult>> {
        let configs = self.configs.list_configs().await?;
        let mut results = Vec::new();

        for config in configs.into_iter().filter(IntegrationConfig::wants_quote_polling) {
            results.push(self.poll_location(config).await);
        }

        let polled = results.iter().filter(|r| !r.skipped).count();
        info!(locations = results.len(), polled, "quote poll pass finished");
        Ok(results)
    }

    async fn poll_location(&self, config: IntegrationConfig) -> LocationPollResult {
        let location_id = config.location_id.clone();
        let now_ms = self.clock.now_ms();

        if let Some(remaining_ms) = config.quote_poll_remaining_ms(now_ms) {
            debug!(location_id = %location_id, remaining_ms, "quote poll not due yet");
            return LocationPollResult::throttled(location_id, remaining_ms);
        }

        match self.configs.claim_quote_poll(&location_id, config.last_quote_poll_at, now_ms).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(location_id = %location_id, "quote poll claimed by another invocation");
                return LocationPollResult { location_id, skipped: true, ..LocationPollResult::default() };
            }
            Err(err) => {
                warn!(location_id = %location_id, error = %err, "failed to claim quote poll");
                return LocationPollResult {
                    location_id,
                    skipped: true,
                    errors: vec![err.to_string()],
                    ..LocationPollResult::default()
                };
            }
        }

        let mut result = LocationPollResult { location_id: location_id.clone(), ..LocationPollResult::default() };
        let mut cursor = config.quote_discovery_cursor.clone();

        match self.discovery.discover(&config, self.clock.now()).await {
            Ok(discovered) => {
                if discovered.quote_ids.is_empty() {
                    debug!(location_id = %location_id, strategy = self.discovery.name(), "no quote candidates");
                }

                let (location, sync_config) = (&location_id, &config);
                let outcomes: Vec<_> = stream::iter(discovered.quote_ids.clone())
                    .map(|quote_id| async move {
                        self.sync.sync_quote(location, &quote_id, sync_config).await
                    })
                    .buffered(self.max_concurrency)
                    .collect()
                    .await;

                // Only transient failures hold the cursor back. A quote that can
                // never sync is reported once and passed over.
                let mut retry_ids = Vec::new();
                for outcome in outcomes {
                    if outcome.success {
                        if !outcome.skipped {
                            result.quotes_synced += 1;
                        }
                        continue;
                    }

                    let message = outcome.error.as_deref().unwrap_or("unknown error");
                    result.errors.push(format!("quote {}: {message}", outcome.quote_id));
                    if outcome.error_kind.map_or(true, SyncErrorKind::is_retryable) {
                        retry_ids.push(outcome.quote_id);
                    } else {
                        warn!(
                            location_id = %location_id,
                            quote_id = %outcome.quote_id,
                            error_kind = ?outcome.error_kind,
                            error = message,
                            "quote cannot be synced, advancing past it"
                        );
                    }
                }
                cursor = self.discovery.settle_cursor(&config, &discovered, &retry_ids);
            }
            Err(err) => {
                warn!(location_id = %location_id, strategy = self.discovery.name(), error = %err, "quote discovery failed");
                result.errors.push(err.to_string());
            }
        }

        if let Err(err) = self.configs.complete_quote_poll(&location_id, now_ms, cursor.as_deref()).await {
            warn!(location_id = %location_id, error = %err, "failed to record quote poll completion");
            result.errors.push(err.to_string());
        }

        info!(
            location_id = %location_id,
            quotes_synced = result.quotes_synced,
            errors = result.errors.len(),
            "location quote poll finished"
        );
        result
    }
}
