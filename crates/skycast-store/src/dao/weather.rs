use rusqlite::{params, Connection, OptionalExtension};

use crate::converters::{json_column, millis_column, to_json, to_millis};
use crate::database::{Database, StoreResult, Table};
use crate::entities::{CachedForecast, CachedWeather};
use crate::live::LiveQuery;

/// Access to the `weather` and `forecast` cache tables.
#[derive(Debug, Clone)]
pub struct WeatherCacheDao {
    db: Database,
}

impl WeatherCacheDao {
    pub(crate) fn new(db: Database) -> Self {
        Self { db }
    }

    fn latest_weather_row(conn: &Connection) -> StoreResult<Option<CachedWeather>> {
        Ok(conn
            .query_row(
                "SELECT id, weatherResponse, locationName, lastUpdated FROM weather
                 ORDER BY lastUpdated DESC, id DESC LIMIT 1",
                [],
                |row| {
                    Ok(CachedWeather {
                        id: row.get(0)?,
                        weather: json_column(row, 1)?,
                        location_name: row.get(2)?,
                        last_updated: millis_column(row, 3)?,
                    })
                },
            )
            .optional()?)
    }

    /// Store a weather payload, replacing any row with the same id.
    pub async fn insert_weather(&self, cached: CachedWeather) -> StoreResult<i64> {
        let payload = to_json(&cached.weather)?;
        self.db
            .write(Table::Weather, move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO weather (id, weatherResponse, locationName, lastUpdated)
                     VALUES (NULLIF(?1, 0), ?2, ?3, ?4)",
                    params![
                        cached.id,
                        payload,
                        cached.location_name,
                        to_millis(&cached.last_updated)
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    /// Store a forecast payload, replacing any row with the same id.
    pub async fn insert_forecast(&self, cached: CachedForecast) -> StoreResult<i64> {
        let payload = to_json(&cached.forecast)?;
        self.db
            .write(Table::Forecast, move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO forecast (id, forecastResponse) VALUES (NULLIF(?1, 0), ?2)",
                    params![cached.id, payload],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    /// Most recently written weather row.
    pub async fn latest_weather(&self) -> StoreResult<Option<CachedWeather>> {
        self.db.read(Self::latest_weather_row).await
    }

    /// Most recently written forecast row.
    pub async fn latest_forecast(&self) -> StoreResult<Option<CachedForecast>> {
        self.db
            .read(|conn| {
                Ok(conn
                    .query_row(
                        "SELECT id, forecastResponse FROM forecast ORDER BY id DESC LIMIT 1",
                        [],
                        |row| {
                            Ok(CachedForecast {
                                id: row.get(0)?,
                                forecast: json_column(row, 1)?,
                            })
                        },
                    )
                    .optional()?)
            })
            .await
    }

    pub async fn clear_weather(&self) -> StoreResult<usize> {
        self.db
            .write(Table::Weather, |conn| Ok(conn.execute("DELETE FROM weather", [])?))
            .await
    }

    pub async fn clear_forecast(&self) -> StoreResult<usize> {
        self.db
            .write(Table::Forecast, |conn| Ok(conn.execute("DELETE FROM forecast", [])?))
            .await
    }

    pub fn observe_latest_weather(&self) -> LiveQuery<Option<CachedWeather>> {
        LiveQuery::new(self.db.clone(), &[Table::Weather], Self::latest_weather_row)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::Duration;
    use futures::StreamExt;
    use skycast_weather::{ForecastItem, ForecastResponse, WeatherResponse};

    fn dao() -> WeatherCacheDao {
        Database::open_in_memory().unwrap().weather_cache()
    }

    fn weather(name: &str) -> WeatherResponse {
        WeatherResponse {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_empty_cache_reads_none() {
        let dao = dao();
        assert!(dao.latest_weather().await.unwrap().is_none());
        assert!(dao.latest_forecast().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_weather_is_last_written() {
        let dao = dao();
        let older = CachedWeather::new(weather("Cairo"));
        let newer = CachedWeather {
            last_updated: older.last_updated + Duration::seconds(5),
            ..CachedWeather::new(weather("Giza"))
        };
        dao.insert_weather(older).await.unwrap();
        let id = dao.insert_weather(newer.clone()).await.unwrap();

        let latest = dao.latest_weather().await.unwrap().unwrap();
        assert_eq!(latest.id, id);
        assert_eq!(latest.location_name, "Giza");
        assert_eq!(latest.weather, newer.weather);
        assert_eq!(latest.last_updated, newer.last_updated);
    }

    #[tokio::test]
    async fn test_same_timestamp_prefers_newest_row() {
        let dao = dao();
        let first = CachedWeather::new(weather("Cairo"));
        let second = CachedWeather {
            last_updated: first.last_updated,
            ..CachedWeather::new(weather("Aswan"))
        };
        dao.insert_weather(first).await.unwrap();
        dao.insert_weather(second).await.unwrap();

        assert_eq!(dao.latest_weather().await.unwrap().unwrap().location_name, "Aswan");
    }

    #[tokio::test]
    async fn test_forecast_round_trip_and_clear() {
        let dao = dao();
        let forecast = ForecastResponse {
            cnt: 1,
            list: vec![ForecastItem {
                dt: 1719835200,
                pop: 0.4,
                ..Default::default()
            }],
            ..Default::default()
        };
        dao.insert_forecast(CachedForecast::new(forecast.clone())).await.unwrap();
        assert_eq!(dao.latest_forecast().await.unwrap().unwrap().forecast, forecast);

        assert_eq!(dao.clear_forecast().await.unwrap(), 1);
        assert!(dao.latest_forecast().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_with_existing_id_replaces() {
        let dao = dao();
        let id = dao.insert_weather(CachedWeather::new(weather("Cairo"))).await.unwrap();
        let replacement = CachedWeather {
            id,
            ..CachedWeather::new(weather("Suez"))
        };
        assert_eq!(dao.insert_weather(replacement).await.unwrap(), id);

        assert_eq!(dao.clear_weather().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_observe_latest_weather() {
        let dao = dao();
        let mut stream = dao.observe_latest_weather().into_stream();
        assert!(stream.next().await.unwrap().unwrap().is_none());

        dao.insert_weather(CachedWeather::new(weather("Luxor"))).await.unwrap();
        let latest = stream.next().await.unwrap().unwrap().unwrap();
        assert_eq!(latest.location_name, "Luxor");

        dao.clear_weather().await.unwrap();
        assert!(stream.next().await.unwrap().unwrap().is_none());
    }
}
