//! Cron-based background schedulers
//!
//! - Appointment sync: bidirectional reconciliation per enabled location
//! - Quote polling: discovery and propagation for due locations
//!
//! Both share [`cron::CronScheduler`]: explicit start/stop, tracked join
//! handles, a cancellation token and a timeout around every job run.

pub mod appointment_scheduler;
pub mod cron;
pub mod error;
pub mod quote_scheduler;

pub use appointment_scheduler::{AppointmentSyncJob, AppointmentSyncScheduler};
pub use cron::{CronScheduler, CronSchedulerConfig, JobReport, ScheduledJob, TickOutcome};
pub use error::{SchedulerError, SchedulerResult};
pub use quote_scheduler::{QuotePollJob, QuotePollScheduler};
