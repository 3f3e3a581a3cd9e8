//! Persisted records.

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use skycast_weather::{Coordinates, ForecastResponse, WeatherResponse};

use crate::converters::now_millis_precision;

/// A location the user pinned on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteLocation {
    /// 0 until the store assigns one.
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub city_name_ar: String,
    #[serde(default)]
    pub city_name_en: String,
}

impl FavoriteLocation {
    /// New, not yet stored favorite.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            id: 0,
            latitude,
            longitude,
            city_name_ar: String::new(),
            city_name_en: String::new(),
        }
    }

    pub fn with_names(mut self, city_name_ar: impl Into<String>, city_name_en: impl Into<String>) -> Self {
        self.city_name_ar = city_name_ar.into();
        self.city_name_en = city_name_en.into();
        self
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// Name in the requested language, falling back to the other one and
    /// then to the coordinates.
    pub fn display_name(&self, language: skycast_core::Language) -> String {
        let (preferred, other) = match language {
            skycast_core::Language::Ar => (&self.city_name_ar, &self.city_name_en),
            skycast_core::Language::En => (&self.city_name_en, &self.city_name_ar),
        };
        [preferred, other]
            .into_iter()
            .find(|name| !name.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| self.coordinates().label())
    }
}

/// How an alert reaches the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    /// Silent notification.
    Notification,
    /// Notification plus looping sound.
    Alarm,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Notification => "NOTIFICATION",
            AlertKind::Alarm => "ALARM",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "NOTIFICATION" => Some(AlertKind::Notification),
            "ALARM" => Some(AlertKind::Alarm),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for AlertKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AlertKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        AlertKind::parse(text)
            .ok_or_else(|| FromSqlError::Other(format!("unknown alert type {text:?}").into()))
    }
}

/// Where an alert is in its lifecycle at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    /// Active and still in the future.
    Scheduled,
    /// Active, trigger time has passed.
    Fired,
    /// Turned off by the user.
    Disabled,
}

/// A one-shot weather alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub id: String,
    pub trigger_time: DateTime<Utc>,
    pub kind: AlertKind,
    pub is_active: bool,
}

impl WeatherAlert {
    /// New active alert with a fresh id.
    pub fn new(trigger_time: DateTime<Utc>, kind: AlertKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            trigger_time: trigger_time.trunc_subsecs(3),
            kind,
            is_active: true,
        }
    }

    pub fn state(&self, now: DateTime<Utc>) -> AlertState {
        if !self.is_active {
            AlertState::Disabled
        } else if self.trigger_time > now {
            AlertState::Scheduled
        } else {
            AlertState::Fired
        }
    }
}

/// Last current-weather payload written to the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedWeather {
    pub id: i64,
    pub weather: WeatherResponse,
    pub location_name: String,
    pub last_updated: DateTime<Utc>,
}

impl CachedWeather {
    pub fn new(weather: WeatherResponse) -> Self {
        let location_name = weather.location_label();
        Self {
            id: 0,
            weather,
            location_name,
            last_updated: now_millis_precision(),
        }
    }
}

/// Last forecast payload written to the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedForecast {
    pub id: i64,
    pub forecast: ForecastResponse,
}

impl CachedForecast {
    pub fn new(forecast: ForecastResponse) -> Self {
        Self { id: 0, forecast }
    }
}
