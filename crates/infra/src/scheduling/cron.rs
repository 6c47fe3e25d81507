//! Cron-driven job runner shared by the sync schedulers.
//!
//! Join handles are tracked, cancellation is explicit, and every
//! asynchronous step is wrapped in a timeout. A fresh `JobScheduler` is
//! built on each `start`, so a stopped scheduler can be started again.
//!
//! Ticks never overlap: a tick that fires while the previous one is still
//! running is skipped. Overlap would be harmless (every store write is an
//! idempotent upsert) but it doubles remote traffic for no gain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fieldbridge_domain::Result as DomainResult;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::observability::metrics::SchedulerMetrics;
use crate::observability::MetricsResult;
use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Work executed on every tick.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &'static str;

    /// One full pass. `Err` means the pass as a whole could not run;
    /// per-item failures belong in the report.
    async fn run(&self) -> DomainResult<JobReport>;
}

/// What a completed tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobReport {
    pub locations: usize,
    pub item_errors: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Completed(JobReport),
    Failed,
    TimedOut,
    /// The previous tick was still running.
    Skipped,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct CronSchedulerConfig {
    /// Six-field cron expression (seconds first).
    pub cron_expression: String,
    pub job_timeout: Duration,
    pub start_timeout: Duration,
    pub stop_timeout: Duration,
    pub join_timeout: Duration,
}

impl CronSchedulerConfig {
    pub fn new(cron_expression: impl Into<String>, job_timeout: Duration) -> Self {
        Self { cron_expression: cron_expression.into(), job_timeout, ..Self::default() }
    }
}

impl Default for CronSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: "0 */15 * * * *".into(),
            job_timeout: Duration::from_secs(600),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Cron scheduler with explicit lifecycle management.
pub struct CronScheduler {
    scheduler: Option<JobScheduler>,
    config: CronSchedulerConfig,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    in_flight: Arc<AtomicBool>,
    metrics: Arc<SchedulerMetrics>,
    job: Arc<dyn ScheduledJob>,
}

impl CronScheduler {
    /// Rejects an unparseable cron expression up front.
    pub fn new(
        config: CronSchedulerConfig,
        job: Arc<dyn ScheduledJob>,
        metrics: Arc<SchedulerMetrics>,
    ) -> SchedulerResult<Self> {
        Job::new_async(config.cron_expression.as_str(), |_id, _lock| Box::pin(async {}))
            .map_err(|source| SchedulerError::JobRegistrationFailed { source })?;

        Ok(Self {
            scheduler: None,
            config,
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            in_flight: Arc::new(AtomicBool::new(false)),
            metrics,
            job,
        })
    }

    pub fn metrics(&self) -> Arc<SchedulerMetrics> {
        Arc::clone(&self.metrics)
    }

    #[instrument(skip(self), fields(job = self.job.name()))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let start_timeout = self.config.start_timeout;
        let scheduler = tokio::time::timeout(start_timeout, JobScheduler::new())
            .await
            .map_err(|source| SchedulerError::Timeout { duration: start_timeout, source })?
            .map_err(|source| SchedulerError::CreationFailed { source })?;

        self.register_job(&scheduler).await?;

        tokio::time::timeout(start_timeout, scheduler.start())
            .await
            .map_err(|source| SchedulerError::Timeout { duration: start_timeout, source })?
            .map_err(|source| SchedulerError::StartFailed { source })?;

        let cancel = self.cancellation.clone();
        let name = self.job.name();
        self.monitor_handle = Some(tokio::spawn(async move {
            cancel.cancelled().await;
            debug!(job = name, "scheduler monitor cancelled");
        }));
        self.scheduler = Some(scheduler);

        info!(cron = %self.config.cron_expression, "scheduler started");
        Ok(())
    }

    /// Cancel in-flight work, shut the cron runner down, and await the monitor.
    #[instrument(skip(self), fields(job = self.job.name()))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        if let Some(mut scheduler) = self.scheduler.take() {
            let stop_timeout = self.config.stop_timeout;
            tokio::time::timeout(stop_timeout, scheduler.shutdown())
                .await
                .map_err(|source| SchedulerError::Timeout { duration: stop_timeout, source })?
                .map_err(|source| SchedulerError::StopFailed { source })?;
        }

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|source| SchedulerError::Timeout { duration: join_timeout, source })??;
        }

        info!("scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.monitor_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    async fn register_job(&self, scheduler: &JobScheduler) -> SchedulerResult<()> {
        let job = Arc::clone(&self.job);
        let metrics = Arc::clone(&self.metrics);
        let in_flight = Arc::clone(&self.in_flight);
        let cancel = self.cancellation.clone();
        let job_timeout = self.config.job_timeout;

        let definition = Job::new_async(self.config.cron_expression.as_str(), move |_id, _lock| {
            let job = Arc::clone(&job);
            let metrics = Arc::clone(&metrics);
            let in_flight = Arc::clone(&in_flight);
            let cancel = cancel.clone();
            Box::pin(async move {
                execute_tick(job.as_ref(), &metrics, &in_flight, &cancel, job_timeout).await;
            })
        })
        .map_err(|source| SchedulerError::JobRegistrationFailed { source })?;

        let job_id = scheduler
            .add(definition)
            .await
            .map_err(|source| SchedulerError::JobRegistrationFailed { source })?;

        debug!(job_id = %job_id, "registered scheduled job");
        Ok(())
    }
}

impl Drop for CronScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!(job = self.job.name(), "scheduler dropped while running; cancelling");
            self.cancellation.cancel();
        }
    }
}

/// Clears the in-flight flag however the tick ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Run one tick under the job timeout, recording metrics for the outcome.
pub async fn execute_tick(
    job: &dyn ScheduledJob,
    metrics: &SchedulerMetrics,
    in_flight: &AtomicBool,
    cancel: &CancellationToken,
    job_timeout: Duration,
) -> TickOutcome {
    if in_flight.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
        debug!(job = job.name(), "previous tick still running; skipping");
        return TickOutcome::Skipped;
    }
    let _guard = InFlightGuard(in_flight);

    log_metric(metrics.record_run(), "run");
    let started = Instant::now();

    let outcome = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(job = job.name(), "tick cancelled");
            TickOutcome::Cancelled
        }
        result = tokio::time::timeout(job_timeout, job.run()) => match result {
            Ok(Ok(report)) => {
                log_metric(metrics.record_item_errors(report.item_errors), "item_errors");
                info!(
                    job = job.name(),
                    locations = report.locations,
                    item_errors = report.item_errors,
                    "scheduled pass finished"
                );
                TickOutcome::Completed(report)
            }
            Ok(Err(err)) => {
                log_metric(metrics.record_failure(), "failure");
                error!(job = job.name(), error = %err, "scheduled pass failed");
                TickOutcome::Failed
            }
            Err(_) => {
                log_metric(metrics.record_timeout(), "timeout");
                warn!(job = job.name(), timeout_secs = job_timeout.as_secs(), "scheduled pass timed out");
                TickOutcome::TimedOut
            }
        }
    };

    log_metric(metrics.record_duration(started.elapsed()), "duration");
    outcome
}

fn log_metric(result: MetricsResult<()>, metric: &'static str) {
    if let Err(err) = result {
        warn!(metric, error = ?err, "Failed to record scheduler metric");
    }
}
