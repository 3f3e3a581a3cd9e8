//! Local persistence: favorites, weather alerts and the last fetched weather.
//!
//! [`Database`] owns the SQLite connection. DAOs are obtained from it
//! (`db.favorites()`, `db.alerts()`, `db.weather_cache()`) and share its
//! change channel, so a [`LiveQuery`] sees every write made through any of
//! them.

pub mod converters;
pub mod dao;
pub mod database;
pub mod entities;
pub mod live;
pub mod schema;

pub use dao::{AlertsDao, FavoritesDao, WeatherCacheDao};
pub use database::{Database, StoreResult, Table};
pub use entities::{
    AlertKind, AlertState, CachedForecast, CachedWeather, FavoriteLocation, WeatherAlert,
};
pub use live::LiveQuery;
pub use schema::SCHEMA_VERSION;
