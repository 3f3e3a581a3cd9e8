//! Remote data source: current weather and forecast over HTTP.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use skycast_core::{Language, ReqwestErrorExt, Units, WeatherConfig, WeatherError};

use crate::retry::{with_retry, RetryConfig};
use crate::types::{Coordinates, ForecastResponse, WeatherResponse};

const CURRENT_ENDPOINT: &str = "weather";
const FORECAST_ENDPOINT: &str = "forecast";

/// Outbound access to the weather provider.
///
/// Implementations only fetch; persisting a result is the caller's decision.
#[async_trait]
pub trait WeatherRemoteDataSource: Send + Sync {
    /// Current conditions at `at`.
    async fn current_weather(&self, at: Coordinates) -> Result<WeatherResponse, WeatherError>;

    /// 5 day / 3 hour forecast at `at`.
    async fn forecast(&self, at: Coordinates) -> Result<ForecastResponse, WeatherError>;
}

/// Error body the provider sends with non-2xx responses
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    message: String,
}

/// HTTP client for the provider's data API.
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
    units: Units,
    language: Language,
    retry: RetryConfig,
}

impl WeatherProvider {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        Ok(Self {
            client: Arc::new(client),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            units: config.units,
            language: config.language,
            retry: RetryConfig {
                max_retries: config.max_retries,
                ..RetryConfig::default()
            },
        })
    }

    /// Replace the retry policy.
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn units(&self) -> Units {
        self.units
    }

    pub fn language(&self) -> Language {
        self.language
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        at: Coordinates,
    ) -> Result<T, WeatherError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let lat = at.latitude.to_string();
        let lon = at.longitude.to_string();

        tracing::debug!(
            "GET {} lat={} lon={} units={} lang={}",
            url,
            lat,
            lon,
            self.units.as_query(),
            self.language.as_query()
        );

        let response = with_retry(&self.retry, || {
            self.client
                .get(&url)
                .query(&[
                    ("lat", lat.as_str()),
                    ("lon", lon.as_str()),
                    ("appid", self.api_key.as_str()),
                    ("units", self.units.as_query()),
                    ("lang", self.language.as_query()),
                ])
                .send()
        })
        .await
        .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ProviderErrorBody>()
                .await
                .map(|body| body.message)
                .unwrap_or_default();

            tracing::warn!("Weather provider returned {} for {}: {}", status, endpoint, message);

            return Err(match status {
                StatusCode::UNAUTHORIZED => WeatherError::InvalidApiKey,
                StatusCode::NOT_FOUND => WeatherError::LocationNotFound(at.label()),
                _ => WeatherError::ApiError {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| WeatherError::Parse(e.to_string()))
    }
}

#[async_trait]
impl WeatherRemoteDataSource for WeatherProvider {
    async fn current_weather(&self, at: Coordinates) -> Result<WeatherResponse, WeatherError> {
        let weather: WeatherResponse = self.get(CURRENT_ENDPOINT, at).await?;
        tracing::info!("Fetched current weather for {}", weather.location_label());
        Ok(weather)
    }

    async fn forecast(&self, at: Coordinates) -> Result<ForecastResponse, WeatherError> {
        let forecast: ForecastResponse = self.get(FORECAST_ENDPOINT, at).await?;
        tracing::info!(
            "Fetched {} forecast steps for {}",
            forecast.list.len(),
            at.label()
        );
        Ok(forecast)
    }
}
