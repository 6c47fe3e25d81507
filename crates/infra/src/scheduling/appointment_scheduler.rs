//! Scheduled bidirectional appointment reconciliation.
//!
//! Each tick runs `sync_all` for every location with appointment sync
//! enabled. Locations run one after another; the engine already fans out
//! within a location.

use std::sync::Arc;

use async_trait::async_trait;
use fieldbridge_core::{AppointmentSyncEngine, IntegrationConfigStore};
use fieldbridge_domain::Result as DomainResult;
use tracing::{instrument, warn};

use super::cron::{CronScheduler, CronSchedulerConfig, JobReport, ScheduledJob};
use super::error::SchedulerResult;
use crate::observability::metrics::SchedulerMetrics;

pub struct AppointmentSyncJob {
    engine: Arc<AppointmentSyncEngine>,
    configs: Arc<dyn IntegrationConfigStore>,
}

impl AppointmentSyncJob {
    pub fn new(engine: Arc<AppointmentSyncEngine>, configs: Arc<dyn IntegrationConfigStore>) -> Self {
        Self { engine, configs }
    }
}

#[async_trait]
impl ScheduledJob for AppointmentSyncJob {
    fn name(&self) -> &'static str {
        "appointment_sync"
    }

    #[instrument(skip(self))]
    async fn run(&self) -> DomainResult<JobReport> {
        let configs = self.configs.list_configs().await?;
        let mut report = JobReport::default();

        for config in configs.iter().filter(|c| c.wants_appointment_sync()) {
            report.locations += 1;
            match self.engine.sync_all(&config.location_id).await {
                Ok(location) => report.item_errors += location.errors + location.listing_errors.len(),
                Err(err) => {
                    warn!(location_id = %config.location_id, error = %err, "appointment sync failed for location");
                    report.item_errors += 1;
                }
            }
        }

        Ok(report)
    }
}

/// Cron-driven `sync_all` over every enabled location.
pub struct AppointmentSyncScheduler {
    inner: CronScheduler,
}

impl AppointmentSyncScheduler {
    pub fn new(config: CronSchedulerConfig, job: AppointmentSyncJob) -> SchedulerResult<Self> {
        let metrics = Arc::new(SchedulerMetrics::new("appointment_sync"));
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
