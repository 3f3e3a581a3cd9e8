use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use tracing::{info, warn};

use skycast_core::{AppError, WeatherError};
use skycast_store::{CachedForecast, CachedWeather, StoreResult};
use skycast_weather::{Coordinates, ForecastResponse, WeatherRemoteDataSource, WeatherResponse};

use crate::local::WeatherLocalDataSource;

/// Where a [`WeatherSnapshot`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataOrigin {
    /// Just fetched from the provider.
    Remote,
    /// Provider failed; last cached payload. Carries the provider error.
    Cache { remote_error: String },
}

/// Current weather together with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub weather: WeatherResponse,
    pub origin: DataOrigin,
    pub updated_at: DateTime<Utc>,
}

/// Remote weather plus the local cache.
///
/// Fetching and persisting are separate calls; only
/// [`WeatherRepository::weather_with_fallback`] combines them.
#[derive(Clone)]
pub struct WeatherRepository {
    remote: Arc<dyn WeatherRemoteDataSource>,
    local: Arc<dyn WeatherLocalDataSource>,
}

impl WeatherRepository {
    pub fn new(
        remote: Arc<dyn WeatherRemoteDataSource>,
        local: Arc<dyn WeatherLocalDataSource>,
    ) -> Self {
        Self { remote, local }
    }

    /// Current weather from the provider. Nothing is cached.
    pub async fn fetch_weather(&self, at: Coordinates) -> Result<WeatherResponse, WeatherError> {
        self.remote.current_weather(at).await
    }

    /// Forecast from the provider. Nothing is cached.
    pub async fn fetch_forecast(&self, at: Coordinates) -> Result<ForecastResponse, WeatherError> {
        self.remote.forecast(at).await
    }

    pub async fn save_weather(&self, weather: WeatherResponse) -> StoreResult<i64> {
        self.local.insert_weather(CachedWeather::new(weather)).await
    }

    pub async fn save_forecast(&self, forecast: ForecastResponse) -> StoreResult<i64> {
        self.local.insert_forecast(CachedForecast::new(forecast)).await
    }

    pub async fn cached_weather(&self) -> StoreResult<Option<CachedWeather>> {
        self.local.latest_weather().await
    }

    pub async fn cached_forecast(&self) -> StoreResult<Option<CachedForecast>> {
        self.local.latest_forecast().await
    }

    pub async fn clear_cache(&self) -> StoreResult<()> {
        self.local.clear_weather().await?;
        self.local.clear_forecast().await?;
        info!("Weather cache cleared");
        Ok(())
    }

    pub fn observe_cached_weather(&self) -> BoxStream<'static, StoreResult<Option<CachedWeather>>> {
        self.local.observe_latest_weather()
    }

    /// Fetch current weather and cache it; fall back to the cache when the
    /// provider does not deliver.
    ///
    /// Any transport failure or non-2xx answer (bad key and unknown location
    /// included) is served from the cache, with the error kept on the
    /// snapshot origin. An unparseable body is returned as-is.
    pub async fn weather_with_fallback(&self, at: Coordinates) -> Result<WeatherSnapshot, AppError> {
        match self.remote.current_weather(at).await {
            Ok(weather) => {
                let cached = CachedWeather::new(weather.clone());
                let updated_at = cached.last_updated;
                if let Err(e) = self.local.insert_weather(cached).await {
                    warn!("Failed to cache weather for {}: {}", at.label(), e);
                }
                Ok(WeatherSnapshot {
                    weather,
                    origin: DataOrigin::Remote,
                    updated_at,
                })
            }
            Err(e) if e.is_network_failure() => {
                warn!("Weather fetch failed for {}, trying cache: {}", at.label(), e);
                match self.local.latest_weather().await? {
                    Some(cached) => Ok(WeatherSnapshot {
                        weather: cached.weather,
                        origin: DataOrigin::Cache {
                            remote_error: e.to_string(),
                        },
                        updated_at: cached.last_updated,
                    }),
                    None => Err(WeatherError::NoCachedData.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}
