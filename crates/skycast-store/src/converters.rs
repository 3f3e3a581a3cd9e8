//! Column converters for values SQLite has no native type for.

use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use rusqlite::types::Type;
use serde::de::DeserializeOwned;
use serde::Serialize;

use skycast_core::DatabaseError;

/// Epoch milliseconds for a UTC instant.
pub fn to_millis(time: &DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

/// UTC instant from epoch milliseconds.
pub fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Current time at the precision the store keeps.
pub fn now_millis_precision() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Read an epoch-millis column into a UTC instant.
pub(crate) fn millis_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    from_millis(millis).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp {millis} out of range").into(),
        )
    })
}

/// Serialize a payload into its text column.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, DatabaseError> {
    Ok(serde_json::to_string(value)?)
}

/// Read a JSON text column into a payload.
pub(crate) fn json_column<T: DeserializeOwned>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use rusqlite::Connection;
    use skycast_weather::WeatherResponse;

    #[test]
    fn test_millis_keep_instant() {
        let time = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(from_millis(to_millis(&time)), Some(time));
    }

    #[test]
    fn test_now_drops_sub_millisecond_precision() {
        let now = now_millis_precision();
        assert_eq!(from_millis(to_millis(&now)), Some(now));
    }

    #[test]
    fn test_bad_json_column_is_serialization_error() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn
            .query_row("SELECT 'not json'", [], |row| json_column::<WeatherResponse>(row, 0))
            .unwrap_err();
        assert!(matches!(
            DatabaseError::from(err),
            DatabaseError::Serialization(_)
        ));
    }

    #[test]
    fn test_json_column_reads_payload() {
        let conn = Connection::open_in_memory().unwrap();
        let weather = WeatherResponse {
            name: "Aswan".to_string(),
            ..Default::default()
        };
        let text = to_json(&weather).unwrap();
        let back: WeatherResponse = conn
            .query_row("SELECT ?1", [text], |row| json_column(row, 0))
            .unwrap();
        assert_eq!(back, weather);
    }
}
