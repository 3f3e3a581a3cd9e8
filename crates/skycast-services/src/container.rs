//! Process-wide service container.
//!
//! `AppServices` is built once at startup and owns the database, the
//! repositories, the alert scheduler and the alarm event channel. Tests build
//! their own instance with [`AppServices::with_parts`] instead of going through
//! the global.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use skycast_core::{AppError, Config};
use skycast_store::Database;
use skycast_weather::{WeatherProvider, WeatherRemoteDataSource};

use crate::alerts::{
    AlarmEvent, AlertActions, AlertPresenter, AlertReceiver, AlertScheduler, TokioAlarmService,
};
use crate::local::{SqliteAlertsDataSource, SqliteFavoritesDataSource, SqliteWeatherDataSource};
use crate::repository::{FavoriteLocationsRepository, WeatherAlertsRepository, WeatherRepository};

/// Global singleton for application services
static SERVICES: OnceLock<Arc<AppServices>> = OnceLock::new();

/// Serializes first-time construction of [`SERVICES`]
static INIT_LOCK: Mutex<()> = parking_lot::const_mutex(());

pub struct AppServices {
    config: Config,
    handle: Handle,
    database: Database,
    favorites: FavoriteLocationsRepository,
    alerts: WeatherAlertsRepository,
    weather: WeatherRepository,
    scheduler: Arc<AlertScheduler>,
    alarm_service: Arc<TokioAlarmService>,
    alarm_events: Mutex<Option<mpsc::UnboundedReceiver<AlarmEvent>>>,
    actions: AlertActions,
    shutdown: CancellationToken,
}

impl AppServices {
    /// The process-wide instance, built from `config` on first use.
    ///
    /// Later calls return the existing instance and ignore their arguments.
    /// Concurrent first calls build exactly one instance.
    pub fn global(config: Config, handle: Handle) -> Result<Arc<Self>, AppError> {
        if let Some(services) = SERVICES.get() {
            return Ok(services.clone());
        }

        let _guard = INIT_LOCK.lock();
        if let Some(services) = SERVICES.get() {
            return Ok(services.clone());
        }

        let services = Arc::new(Self::build(config, handle)?);
        let _ = SERVICES.set(services.clone());
        Ok(services)
    }

    /// Build an instance backed by the configured database file and provider.
    pub fn build(config: Config, handle: Handle) -> Result<Self, AppError> {
        let database = Database::open(config.database_path())?;
        let remote = Arc::new(WeatherProvider::new(&config.weather)?);
        Ok(Self::with_parts(config, database, remote, handle))
    }

    /// Build an instance from already-constructed collaborators.
    pub fn with_parts(
        config: Config,
        database: Database,
        remote: Arc<dyn WeatherRemoteDataSource>,
        handle: Handle,
    ) -> Self {
        let shutdown = CancellationToken::new();

        let favorites = FavoriteLocationsRepository::new(Arc::new(
            SqliteFavoritesDataSource::new(database.favorites()),
        ));
        let alerts =
            WeatherAlertsRepository::new(Arc::new(SqliteAlertsDataSource::new(database.alerts())));
        let weather = WeatherRepository::new(
            remote,
            Arc::new(SqliteWeatherDataSource::new(database.weather_cache())),
        );

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let alarm_service = Arc::new(TokioAlarmService::new(
            handle.clone(),
            events_tx.clone(),
            shutdown.child_token(),
        ));
        let scheduler = Arc::new(AlertScheduler::new(alerts.clone(), alarm_service.clone()));

        Self {
            config,
            handle,
            database,
            favorites,
            alerts,
            weather,
            scheduler,
            alarm_service,
            alarm_events: Mutex::new(Some(events_rx)),
            actions: AlertActions::new(events_tx),
            shutdown,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn favorites(&self) -> &FavoriteLocationsRepository {
        &self.favorites
    }

    pub fn alerts(&self) -> &WeatherAlertsRepository {
        &self.alerts
    }

    pub fn weather(&self) -> &WeatherRepository {
        &self.weather
    }

    pub fn scheduler(&self) -> Arc<AlertScheduler> {
        self.scheduler.clone()
    }

    pub fn alert_actions(&self) -> AlertActions {
        self.actions.clone()
    }

    /// Child token cancelled by [`AppServices::shutdown`].
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// Start background work: the alert list sync and, if configured,
    /// re-arming timers for saved alerts.
    ///
    /// Returns the number of timers re-armed.
    pub async fn start(&self) -> Result<usize, AppError> {
        self.handle
            .spawn(self.scheduler.sync_task(self.shutdown.child_token()));

        if self.config.alerts.reschedule_on_start {
            self.scheduler.reschedule_active().await
        } else {
            Ok(0)
        }
    }

    /// Spawn the receiver that turns fired alarms into presenter calls.
    ///
    /// Only the first call gets the receiver; later calls return `None`.
    pub fn spawn_alert_receiver(&self, presenter: Arc<dyn AlertPresenter>) -> Option<JoinHandle<()>> {
        let events = self.alarm_events.lock().take()?;
        let receiver = AlertReceiver::new(events, presenter);
        Some(self.handle.spawn(receiver.run(self.shutdown.child_token())))
    }

    /// Cancel timers and stop every background task.
    pub fn shutdown(&self) {
        info!("AppServices shutdown initiated");
        self.alarm_service.cancel_all();
        self.shutdown.cancel();
    }
}
