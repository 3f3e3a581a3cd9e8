//! Local data sources: the store's DAOs behind async traits.
//!
//! Repositories only see these traits, so tests can swap in fakes.

use async_trait::async_trait;
use futures::stream::BoxStream;

use skycast_store::{
    AlertsDao, CachedForecast, CachedWeather, FavoriteLocation, FavoritesDao, StoreResult,
    WeatherAlert, WeatherCacheDao,
};

#[async_trait]
pub trait FavoritesLocalDataSource: Send + Sync {
    /// All favorites, re-emitted whenever they change.
    fn observe_all(&self) -> BoxStream<'static, StoreResult<Vec<FavoriteLocation>>>;
    async fn insert(&self, favorite: FavoriteLocation) -> StoreResult<i64>;
    async fn update(&self, favorite: FavoriteLocation) -> StoreResult<usize>;
    async fn delete(&self, id: i64) -> StoreResult<usize>;
    async fn exists(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait AlertsLocalDataSource: Send + Sync {
    /// All alerts by trigger time, re-emitted whenever they change.
    fn observe_all(&self) -> BoxStream<'static, StoreResult<Vec<WeatherAlert>>>;
    async fn get(&self, id: &str) -> StoreResult<Option<WeatherAlert>>;
    async fn get_active(&self) -> StoreResult<Vec<WeatherAlert>>;
    async fn insert(&self, alert: WeatherAlert) -> StoreResult<()>;
    async fn update(&self, alert: WeatherAlert) -> StoreResult<usize>;
    async fn update_status(&self, id: &str, active: bool) -> StoreResult<usize>;
    /// Flip an active alert to inactive. `false` when it was missing or
    /// already inactive.
    async fn deactivate(&self, id: &str) -> StoreResult<bool>;
    async fn delete(&self, id: &str) -> StoreResult<usize>;
}

#[async_trait]
pub trait WeatherLocalDataSource: Send + Sync {
    async fn insert_weather(&self, cached: CachedWeather) -> StoreResult<i64>;
    async fn insert_forecast(&self, cached: CachedForecast) -> StoreResult<i64>;
    async fn latest_weather(&self) -> StoreResult<Option<CachedWeather>>;
    async fn latest_forecast(&self) -> StoreResult<Option<CachedForecast>>;
    async fn clear_weather(&self) -> StoreResult<usize>;
    async fn clear_forecast(&self) -> StoreResult<usize>;
    fn observe_latest_weather(&self) -> BoxStream<'static, StoreResult<Option<CachedWeather>>>;
}

/// SQLite-backed favorites.
#[derive(Debug, Clone)]
pub struct SqliteFavoritesDataSource {
    dao: FavoritesDao,
}

impl SqliteFavoritesDataSource {
    pub fn new(dao: FavoritesDao) -> Self {
        Self { dao }
    }
}

#[async_trait]
impl FavoritesLocalDataSource for SqliteFavoritesDataSource {
    fn observe_all(&self) -> BoxStream<'static, StoreResult<Vec<FavoriteLocation>>> {
        self.dao.observe_all().into_stream()
    }

    async fn insert(&self, favorite: FavoriteLocation) -> StoreResult<i64> {
        self.dao.insert(favorite).await
    }

    async fn update(&self, favorite: FavoriteLocation) -> StoreResult<usize> {
        self.dao.update(favorite).await
    }

    async fn delete(&self, id: i64) -> StoreResult<usize> {
        self.dao.delete(id).await
    }

    async fn exists(&self, id: i64) -> StoreResult<bool> {
        self.dao.exists(id).await
    }
}

/// SQLite-backed alerts.
#[derive(Debug, Clone)]
pub struct SqliteAlertsDataSource {
    dao: AlertsDao,
}

impl SqliteAlertsDataSource {
    pub fn new(dao: AlertsDao) -> Self {
        Self { dao }
    }
}

#[async_trait]
impl AlertsLocalDataSource for SqliteAlertsDataSource {
    fn observe_all(&self) -> BoxStream<'static, StoreResult<Vec<WeatherAlert>>> {
        self.dao.observe_all().into_stream()
    }

    async fn get(&self, id: &str) -> StoreResult<Option<WeatherAlert>> {
        self.dao.get(id).await
    }

    async fn get_active(&self) -> StoreResult<Vec<WeatherAlert>> {
        self.dao.get_active().await
    }

    async fn insert(&self, alert: WeatherAlert) -> StoreResult<()> {
        self.dao.insert(alert).await
    }

    async fn update(&self, alert: WeatherAlert) -> StoreResult<usize> {
        self.dao.update(alert).await
    }

    async fn update_status(&self, id: &str, active: bool) -> StoreResult<usize> {
        self.dao.update_status(id, active).await
    }

    async fn deactivate(&self, id: &str) -> StoreResult<bool> {
        self.dao.deactivate(id).await
    }

    async fn delete(&self, id: &str) -> StoreResult<usize> {
        self.dao.delete(id).await
    }
}

/// SQLite-backed weather cache.
#[derive(Debug, Clone)]
pub struct SqliteWeatherDataSource {
    dao: WeatherCacheDao,
}

impl SqliteWeatherDataSource {
    pub fn new(dao: WeatherCacheDao) -> Self {
        Self { dao }
    }
}

#[async_trait]
impl WeatherLocalDataSource for SqliteWeatherDataSource {
    async fn insert_weather(&self, cached: CachedWeather) -> StoreResult<i64> {
        self.dao.insert_weather(cached).await
    }

    async fn insert_forecast(&self, cached: CachedForecast) -> StoreResult<i64> {
        self.dao.insert_forecast(cached).await
    }

    async fn latest_weather(&self) -> StoreResult<Option<CachedWeather>> {
        self.dao.latest_weather().await
    }

    async fn latest_forecast(&self) -> StoreResult<Option<CachedForecast>> {
        self.dao.latest_forecast().await
    }

    async fn clear_weather(&self) -> StoreResult<usize> {
        self.dao.clear_weather().await
    }

    async fn clear_forecast(&self) -> StoreResult<usize> {
        self.dao.clear_forecast().await
    }

    fn observe_latest_weather(&self) -> BoxStream<'static, StoreResult<Option<CachedWeather>>> {
        self.dao.observe_latest_weather().into_stream()
    }
}
