//! Application services for SkyCast.
//!
//! Local data sources wrap the store's DAOs behind object-safe traits,
//! repositories compose them with the remote weather provider, and the
//! alert scheduler turns saved alerts into timers. [`AppServices`] wires all
//! of it together once per process.

pub mod alerts;
pub mod container;
pub mod local;
pub mod repository;

pub use alerts::{
    alarm_key, AlarmEvent, AlarmService, AlertActions, AlertPresenter, AlertReceiver,
    AlertScheduler, LogPresenter, ScheduledAlarm, TokioAlarmService,
};
pub use container::AppServices;
pub use local::{
    AlertsLocalDataSource, FavoritesLocalDataSource, SqliteAlertsDataSource,
    SqliteFavoritesDataSource, SqliteWeatherDataSource, WeatherLocalDataSource,
};
pub use repository::{
    DataOrigin, FavoriteLocationsRepository, WeatherAlertsRepository, WeatherRepository,
    WeatherSnapshot,
};
