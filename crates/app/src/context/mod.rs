//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use fieldbridge_core::{
    AppointmentGateway, AppointmentSyncEngine, AppointmentSyncStore, AvailabilityService,
    CrmContactGateway, EngineSettings, IdRangeDiscovery, IntegrationConfigStore, QuoteDiscovery,
    QuotePoller, QuoteSource, QuoteSyncService, QuoteSyncStore, RecentlyModifiedDiscovery,
    TeamCalendarMappingService, TeamCalendarMappingStore,
};
use fieldbridge_domain::{Config, FieldBridgeError, QuoteDiscoveryStrategy, Result};
use fieldbridge_infra::scheduling::{
    AppointmentSyncJob, CronSchedulerConfig, QuotePollJob, SchedulerResult,
};
use fieldbridge_infra::{
    AppointmentSyncScheduler, CrmClient, DbManager, FssClient, QuotePollScheduler,
    SqliteAppointmentSyncRepository, SqliteIntegrationConfigRepository,
    SqliteQuoteSyncRepository, SqliteTeamMappingRepository,
};
use tokio::sync::Mutex;
use tracing::{error, info};

const SCHEDULER_START_TIMEOUT: Duration = Duration::from_secs(10);

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,

    // Stores
    pub configs: Arc<dyn IntegrationConfigStore>,
    pub sync_records: Arc<dyn AppointmentSyncStore>,

    // Services
    pub engine: Arc<AppointmentSyncEngine>,
    pub availability: AvailabilityService,
    pub mappings: TeamCalendarMappingService,
    pub quote_sync: QuoteSyncService,
    pub quote_poller: Arc<QuotePoller>,

    // Schedulers are built lazily by `start_schedulers`
    appointment_scheduler: Mutex<Option<AppointmentSyncScheduler>>,
    quote_scheduler: Mutex<Option<QuotePollScheduler>>,
}

impl AppContext {
    /// Open the database from `config`, run migrations and wire every
    /// service. Gateways are built from the `fss` and `crm` sections.
    pub fn new_with_config(config: Config) -> Result<Self> {
        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;

        let fss = Arc::new(FssClient::from_config(&config.fss)?);
        let crm = Arc::new(CrmClient::from_config(&config.crm)?);

        Ok(Self::with_gateways(config, db, fss, crm))
    }

    /// Wire the services over an already migrated database and concrete
    /// gateway adapters.
    pub fn with_gateways(
        config: Config,
        db: Arc<DbManager>,
        fss: Arc<FssClient>,
        crm: Arc<CrmClient>,
    ) -> Self {
        let configs: Arc<dyn IntegrationConfigStore> =
            Arc::new(SqliteIntegrationConfigRepository::new(db.clone()));
        let sync_records: Arc<dyn AppointmentSyncStore> =
            Arc::new(SqliteAppointmentSyncRepository::new(db.clone()));
        let mapping_store: Arc<dyn TeamCalendarMappingStore> =
            Arc::new(SqliteTeamMappingRepository::new(db.clone()));
        let quote_records: Arc<dyn QuoteSyncStore> = Arc::new(SqliteQuoteSyncRepository::new(db.clone()));

        let fss_appointments: Arc<dyn AppointmentGateway> = fss.clone();
        let crm_appointments: Arc<dyn AppointmentGateway> = crm.clone();
        let quote_source: Arc<dyn QuoteSource> = fss;
        let crm_contacts: Arc<dyn CrmContactGateway> = crm;

        let request_timeout = Duration::from_secs(config.sync.request_timeout_secs);
        let settings = EngineSettings {
            request_timeout,
            lookback_days: config.sync.lookback_days,
            lookahead_days: config.sync.lookahead_days,
            max_concurrency: config.sync.max_concurrency,
        };

        let engine = Arc::new(
            AppointmentSyncEngine::new(
                fss_appointments.clone(),
                crm_appointments,
                sync_records.clone(),
                mapping_store.clone(),
                configs.clone(),
            )
            .with_settings(settings),
        );

        let mappings = TeamCalendarMappingService::new(mapping_store);
        let availability = AvailabilityService::new(mappings.clone(), fss_appointments)
            .with_request_timeout(request_timeout);

        let quote_sync = QuoteSyncService::new(quote_source.clone(), crm_contacts, quote_records)
            .with_request_timeout(request_timeout);
        let discovery: Arc<dyn QuoteDiscovery> = match config.sync.quote_discovery {
            QuoteDiscoveryStrategy::IdRange => Arc::new(IdRangeDiscovery::new(quote_source)),
            QuoteDiscoveryStrategy::RecentlyModified => {
                Arc::new(RecentlyModifiedDiscovery::new(quote_source))
            }
        };
        let quote_poller = Arc::new(
            QuotePoller::new(configs.clone(), discovery, quote_sync.clone())
                .with_max_concurrency(config.sync.max_concurrency),
        );

        info!(
            db_path = %db.path().display(),
            quote_discovery = %config.sync.quote_discovery,
            "application context ready"
        );

        Self {
            config,
            db,
            configs,
            sync_records,
            engine,
            availability,
            mappings,
            quote_sync,
            quote_poller,
            appointment_scheduler: Mutex::new(None),
            quote_scheduler: Mutex::new(None),
        }
    }

    /// Build and start both cron schedulers. Calling this while they are
    /// already running is an `InvalidInput` error.
    pub async fn start_schedulers(&self) -> Result<()> {
        let job_timeout = Duration::from_secs(self.config.sync.job_timeout_secs);

        let mut appointment_slot = self.appointment_scheduler.lock().await;
        let mut quote_slot = self.quote_scheduler.lock().await;
        if appointment_slot.is_some() || quote_slot.is_some() {
            return Err(FieldBridgeError::InvalidInput("schedulers are already running".into()));
        }

        let appointment_config = CronSchedulerConfig::new(self.config.sync.appointment_cron.clone(), job_timeout);
        let mut appointments = AppointmentSyncScheduler::new(
            appointment_config,
            AppointmentSyncJob::new(Arc::clone(&self.engine), Arc::clone(&self.configs)),
        )
        .map_err(|err| scheduler_error("AppointmentSyncScheduler", "construct", err))?;
        start_with_timeout("AppointmentSyncScheduler", appointments.start()).await?;

        let quote_config = CronSchedulerConfig::new(self.config.sync.quote_cron.clone(), job_timeout);
        let mut quotes = match QuotePollScheduler::new(quote_config, QuotePollJob::new(Arc::clone(&self.quote_poller))) {
            Ok(quotes) => quotes,
            Err(err) => {
                let _ = appointments.stop().await;
                return Err(scheduler_error("QuotePollScheduler", "construct", err));
            }
        };
        if let Err(err) = start_with_timeout("QuotePollScheduler", quotes.start()).await {
            let _ = appointments.stop().await;
            return Err(err);
        }

        *appointment_slot = Some(appointments);
        *quote_slot = Some(quotes);
        info!("schedulers started");
        Ok(())
    }

    /// Stop whichever schedulers are running. Idempotent.
    pub async fn stop_schedulers(&self) -> Result<()> {
        let mut first_error = None;

        if let Some(mut scheduler) = self.appointment_scheduler.lock().await.take() {
            if let Err(err) = scheduler.stop().await {
                first_error.get_or_insert(scheduler_error("AppointmentSyncScheduler", "stop", err));
            }
        }
        if let Some(mut scheduler) = self.quote_scheduler.lock().await.take() {
            if let Err(err) = scheduler.stop().await {
                first_error.get_or_insert(scheduler_error("QuotePollScheduler", "stop", err));
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                info!("schedulers stopped");
                Ok(())
            }
        }
    }

    pub async fn schedulers_running(&self) -> bool {
        let appointments = self.appointment_scheduler.lock().await;
        let quotes = self.quote_scheduler.lock().await;
        appointments.as_ref().is_some_and(|s| s.is_running()) && quotes.as_ref().is_some_and(|s| s.is_running())
    }

    /// Acquire a connection and run a trivial query.
    pub fn health_check(&self) -> Result<()> {
        self.db.health_check()
    }
}

async fn start_with_timeout(
    name: &'static str,
    start: impl std::future::Future<Output = SchedulerResult<()>>,
) -> Result<()> {
    tokio::time::timeout(SCHEDULER_START_TIMEOUT, start)
        .await
        .map_err(|_| {
            error!(scheduler = name, timeout_secs = SCHEDULER_START_TIMEOUT.as_secs(), "scheduler start timed out");
            FieldBridgeError::Internal(format!(
                "{name} start timed out after {}s",
                SCHEDULER_START_TIMEOUT.as_secs()
            ))
        })?
        .map_err(|err| scheduler_error(name, "start", err))
}

fn scheduler_error(name: &'static str, action: &str, err: impl std::fmt::Display) -> FieldBridgeError {
    error!(scheduler = name, error = %err, "failed to {action} scheduler");
    FieldBridgeError::Internal(format!("failed to {action} {name}: {err}"))
}
