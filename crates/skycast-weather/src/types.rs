//! Provider payloads for the current-weather and 5 day / 3 hour forecast endpoints.
//!
//! Fields follow the provider's JSON names. Everything that the provider may
//! omit is defaulted so that a cached payload written by an older build still
//! parses.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// A point on the map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// "lat, lon" with four decimals, used when the provider has no city name
    pub fn label(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
}

/// One entry of the provider's `weather` array
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

impl Condition {
    /// Icon URL on the provider's CDN
    pub fn icon_url(&self) -> String {
        format!("https://openweathermap.org/img/wn/{}@2x.png", self.icon)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MainMetrics {
    #[serde(default)]
    pub temp: f64,
    #[serde(default)]
    pub feels_like: f64,
    #[serde(default)]
    pub temp_min: f64,
    #[serde(default)]
    pub temp_max: f64,
    #[serde(default)]
    pub pressure: i32,
    #[serde(default)]
    pub humidity: i32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Wind {
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub deg: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Clouds {
    #[serde(default)]
    pub all: i32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default)]
    pub sunrise: i64,
    #[serde(default)]
    pub sunset: i64,
}

/// Current conditions for one location
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherResponse {
    #[serde(default)]
    pub coord: Coord,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub main: MainMetrics,
    #[serde(default)]
    pub visibility: i32,
    #[serde(default)]
    pub wind: Wind,
    #[serde(default)]
    pub clouds: Clouds,
    /// Observation time, unix seconds
    #[serde(default)]
    pub dt: i64,
    #[serde(default)]
    pub sys: Sys,
    /// Shift from UTC in seconds
    #[serde(default)]
    pub timezone: i32,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

impl WeatherResponse {
    /// Primary condition, if the provider sent any
    pub fn condition(&self) -> Option<&Condition> {
        self.weather.first()
    }

    /// City name, falling back to the coordinates
    pub fn location_label(&self) -> String {
        if self.name.trim().is_empty() {
            Coordinates::new(self.coord.lat, self.coord.lon).label()
        } else {
            self.name.clone()
        }
    }

    /// Observation time in UTC
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.dt, 0).single()
    }
}

/// One 3-hour step of the forecast
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastItem {
    /// Step time, unix seconds
    pub dt: i64,
    #[serde(default)]
    pub main: MainMetrics,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub clouds: Clouds,
    #[serde(default)]
    pub wind: Wind,
    #[serde(default)]
    pub visibility: i32,
    /// Probability of precipitation, 0.0..=1.0
    #[serde(default)]
    pub pop: f64,
    #[serde(default)]
    pub dt_txt: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct City {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub coord: Coord,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub timezone: i32,
    #[serde(default)]
    pub sunrise: i64,
    #[serde(default)]
    pub sunset: i64,
}

/// 5 day / 3 hour forecast
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub cnt: i32,
    #[serde(default)]
    pub list: Vec<ForecastItem>,
    #[serde(default)]
    pub city: City,
}

/// Forecast steps folded into one calendar day (in the city's local time)
#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub temp_min: f64,
    pub temp_max: f64,
    /// Condition of the step closest to local noon
    pub condition: Option<Condition>,
    pub max_pop: f64,
}

impl ForecastResponse {
    /// Group the 3-hour steps by local date, in chronological order.
    pub fn daily(&self) -> Vec<DailySummary> {
        let offset = FixedOffset::east_opt(self.city.timezone).unwrap_or(Utc.fix());

        let mut days: Vec<(DailySummary, u32)> = Vec::new();

        for item in &self.list {
            let Some(local) = offset.timestamp_opt(item.dt, 0).single() else {
                continue;
            };
            let date = local.date_naive();
            let noon_distance = (local.hour() as i32 - 12).unsigned_abs();

            match days.last_mut() {
                Some((day, best)) if day.date == date => {
                    day.temp_min = day.temp_min.min(item.main.temp_min);
                    day.temp_max = day.temp_max.max(item.main.temp_max);
                    day.max_pop = day.max_pop.max(item.pop);
                    if noon_distance < *best {
                        day.condition = item.weather.first().cloned();
                        *best = noon_distance;
                    }
                }
                _ => days.push((
                    DailySummary {
                        date,
                        temp_min: item.main.temp_min,
                        temp_max: item.main.temp_max,
                        condition: item.weather.first().cloned(),
                        max_pop: item.pop,
                    },
                    noon_distance,
                )),
            }
        }

        days.into_iter().map(|(day, _)| day).collect()
    }
}
