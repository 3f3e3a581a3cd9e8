use rusqlite::{params, Connection, OptionalExtension};

use crate::converters::{millis_column, to_millis};
use crate::database::{Database, StoreResult, Table};
use crate::entities::WeatherAlert;
use crate::live::LiveQuery;

const COLUMNS: &str = "id, triggerTime, alertType, isActive";

/// Access to `weather_alerts`.
#[derive(Debug, Clone)]
pub struct AlertsDao {
    db: Database,
}

impl AlertsDao {
    pub(crate) fn new(db: Database) -> Self {
        Self { db }
    }

    fn row_to_alert(row: &rusqlite::Row) -> rusqlite::Result<WeatherAlert> {
        let is_active: i32 = row.get(3)?;
        Ok(WeatherAlert {
            id: row.get(0)?,
            trigger_time: millis_column(row, 1)?,
            kind: row.get(2)?,
            is_active: is_active != 0,
        })
    }

    fn list(conn: &Connection) -> StoreResult<Vec<WeatherAlert>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM weather_alerts ORDER BY triggerTime, id"
        ))?;
        let rows = stmt.query_map([], Self::row_to_alert)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Insert a new alert. An existing id is a constraint violation.
    pub async fn insert(&self, alert: WeatherAlert) -> StoreResult<()> {
        self.db
            .write(Table::WeatherAlerts, move |conn| {
                conn.execute(
                    "INSERT INTO weather_alerts (id, triggerTime, alertType, isActive)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        alert.id,
                        to_millis(&alert.trigger_time),
                        alert.kind,
                        alert.is_active
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Overwrite every column of the alert with this id. Returns rows affected.
    pub async fn update(&self, alert: WeatherAlert) -> StoreResult<usize> {
        self.db
            .write(Table::WeatherAlerts, move |conn| {
                Ok(conn.execute(
                    "UPDATE weather_alerts SET triggerTime = ?2, alertType = ?3, isActive = ?4
                     WHERE id = ?1",
                    params![
                        alert.id,
                        to_millis(&alert.trigger_time),
                        alert.kind,
                        alert.is_active
                    ],
                )?)
            })
            .await
    }

    pub async fn update_status(&self, id: &str, active: bool) -> StoreResult<usize> {
        let id = id.to_string();
        self.db
            .write(Table::WeatherAlerts, move |conn| {
                Ok(conn.execute(
                    "UPDATE weather_alerts SET isActive = ?2 WHERE id = ?1",
                    params![id, active],
                )?)
            })
            .await
    }

    /// Set an active alert inactive. `true` only when this call flipped it.
    pub async fn deactivate(&self, id: &str) -> StoreResult<bool> {
        let id = id.to_string();
        self.db
            .write(Table::WeatherAlerts, move |conn| {
                let changed = conn.execute(
                    "UPDATE weather_alerts SET isActive = 0 WHERE id = ?1 AND isActive = 1",
                    params![id],
                )?;
                Ok(changed == 1)
            })
            .await
    }

    pub async fn delete(&self, id: &str) -> StoreResult<usize> {
        let id = id.to_string();
        self.db
            .write(Table::WeatherAlerts, move |conn| {
                Ok(conn.execute("DELETE FROM weather_alerts WHERE id = ?1", params![id])?)
            })
            .await
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<WeatherAlert>> {
        let id = id.to_string();
        self.db
            .read(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {COLUMNS} FROM weather_alerts WHERE id = ?1"),
                        params![id],
                        Self::row_to_alert,
                    )
                    .optional()?)
            })
            .await
    }

    /// Active alerts ordered by trigger time.
    pub async fn get_active(&self) -> StoreResult<Vec<WeatherAlert>> {
        self.db
            .read(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM weather_alerts WHERE isActive = 1 ORDER BY triggerTime, id"
                ))?;
                let rows = stmt.query_map([], Self::row_to_alert)?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
    }

    pub async fn get_all(&self) -> StoreResult<Vec<WeatherAlert>> {
        self.db.read(Self::list).await
    }

    /// Every alert ordered by trigger time, re-emitted on each change.
    pub fn observe_all(&self) -> LiveQuery<Vec<WeatherAlert>> {
        LiveQuery::new(self.db.clone(), &[Table::WeatherAlerts], Self::list)
    }
}
