//! Scheduled quote polling.
//!
//! The cron cadence only decides how often due locations are checked;
//! each location's own polling interval is enforced by the poller's
//! conditional claim, so a short cron period does not over-poll.

use std::sync::Arc;

use async_trait::async_trait;
use fieldbridge_core::QuotePoller;
use fieldbridge_domain::Result as DomainResult;
use tracing::instrument;

use super::cron::{CronScheduler, CronSchedulerConfig, JobReport, ScheduledJob};
use super::error::SchedulerResult;
use crate::observability::metrics::SchedulerMetrics;

pub struct QuotePollJob {
    poller: Arc<QuotePoller>,
}

impl QuotePollJob {
    pub fn new(poller: Arc<QuotePoller>) -> Self {
        Self { poller }
    }
}

#[async_trait]
impl ScheduledJob for QuotePollJob {
    fn name(&self) -> &'static str {
        "quote_poll"
    }

    #[instrument(skip(self))]
    async fn run(&self) -> DomainResult<JobReport> {
        let results = self.poller.poll_due_locations().await?;
        Ok(JobReport {
            locations: results.iter().filter(|r| !r.skipped).count(),
            item_errors: results.iter().map(|r| r.errors.len()).sum(),
        })
    }
}

/// Cron-driven `poll_due_locations`.
pub struct QuotePollScheduler {
    inner: CronScheduler,
}

impl QuotePollScheduler {
    pub fn new(config: CronSchedulerConfig, job: QuotePollJob) -> SchedulerResult<Self> {
        let metrics = Arc::new(SchedulerMetrics::new("quote_poll"));
        Ok(Self { inner: CronScheduler::new(config, Arc::new(job), metrics)? })
    }

    pub async fn start(&mut self) -> SchedulerResult<()> {
        self.inner.start().await
    }

    pub async fn stop(&mut self) -> SchedulerResult<()> {
        self.inner.stop().await
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    pub fn metrics(&self) -> Arc<SchedulerMetrics> {
        self.inner.metrics()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use fieldbridge_core::{IdRangeDiscovery, IntegrationConfigStore, QuoteSyncService};
    use fieldbridge_domain::{GatewayConfig, IntegrationConfig};
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::database::{DbManager, SqliteIntegrationConfigRepository, SqliteQuoteSyncRepository};
    use crate::integrations::{CrmClient, FssClient};

    #[tokio::test(flavor = "multi_thread")]
    async fn due_location_is_polled_once_per_interval() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/locations/loc-1/quotes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"quotes": []})))
            .expect(1)
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().expect("temp dir created");
        let db = Arc::new(DbManager::new(temp_dir.path().join("quotes.db"), 2).expect("db manager created"));
        db.run_migrations().expect("migrations run");

        let configs = Arc::new(SqliteIntegrationConfigRepository::new(db.clone()));
        let mut config = IntegrationConfig::new("loc-1", Utc::now());
        config.enabled = true;
        config.quote_polling_enabled = true;
        config.sync_quotes = true;
        configs.save_config(&config).await.unwrap();

        let fss = Arc::new(
            FssClient::from_config(&GatewayConfig { base_url: server.uri(), ..GatewayConfig::default() }).unwrap(),
        );
        let crm = Arc::new(
            CrmClient::from_config(&GatewayConfig { base_url: server.uri(), ..GatewayConfig::default() }).unwrap(),
        );
        let sync = QuoteSyncService::new(fss.clone(), crm, Arc::new(SqliteQuoteSyncRepository::new(db.clone())));
        let poller = Arc::new(QuotePoller::new(configs.clone(), Arc::new(IdRangeDiscovery::new(fss)), sync));
        let job = QuotePollJob::new(poller);

        assert_eq!(job.run().await.unwrap(), JobReport { locations: 1, item_errors: 0 });
        // second tick inside the interval is throttled
        assert_eq!(job.run().await.unwrap(), JobReport { locations: 0, item_errors: 0 });
        assert!(configs.get_config("loc-1").await.unwrap().unwrap().last_quote_poll_at.is_some());
    }
}
