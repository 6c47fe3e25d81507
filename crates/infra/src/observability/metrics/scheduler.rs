//! Per-scheduler job counters and timing
//!
//! One instance per scheduler. Counters are independent, so relaxed
//! ordering is enough; durations sit in a bounded ring buffer for
//! percentile reads.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::observability::{MetricsError, MetricsResult};

const MAX_DURATION_SAMPLES: usize = 500;

#[derive(Debug)]
pub struct SchedulerMetrics {
    name: &'static str,
    runs: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
    item_errors: AtomicU64,
    durations_ms: Mutex<VecDeque<u64>>,
}

impl SchedulerMetrics {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            runs: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            item_errors: AtomicU64::new(0),
            durations_ms: Mutex::new(VecDeque::with_capacity(MAX_DURATION_SAMPLES)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// A job tick started.
    pub fn record_run(&self) -> MetricsResult<()> {
        self.runs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// The job returned an error for the tick as a whole.
    pub fn record_failure(&self) -> MetricsResult<()> {
        self.failures.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_timeout(&self) -> MetricsResult<()> {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Item-level failures reported inside an otherwise completed tick.
    pub fn record_item_errors(&self, count: usize) -> MetricsResult<()> {
        self.item_errors.fetch_add(count as u64, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_duration(&self, duration: Duration) -> MetricsResult<()> {
        let mut samples = self.samples();
        samples.push_back(duration.as_millis() as u64);
        if samples.len() > MAX_DURATION_SAMPLES {
            samples.pop_front();
        }
        Ok(())
    }

    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    pub fn item_errors(&self) -> u64 {
        self.item_errors.load(Ordering::Relaxed)
    }

    /// Nearest-rank P95 over the retained samples.
    pub fn p95_duration_ms(&self) -> MetricsResult<u64> {
        let mut sorted: Vec<u64> = self.samples().iter().copied().collect();
        if sorted.is_empty() {
            return Err(MetricsError::EmptyData { metric: "P95" });
        }
        sorted.sort_unstable();
        let rank = ((sorted.len() as f64) * 0.95).ceil() as usize;
        Ok(sorted[rank.clamp(1, sorted.len()) - 1])
    }

    fn samples(&self) -> MutexGuard<'_, VecDeque<u64>> {
        match self.durations_ms.lock() {
            Ok(guard) => guard,
            Err(poison_err) => {
                tracing::warn!(metric = self.name, "Mutex poisoned on duration samples, recovering");
                poison_err.into_inner()
            }
        }
    }
}
