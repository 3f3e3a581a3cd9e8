//! Database handle shared by every DAO.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;
use tokio::sync::broadcast;
use tracing::{debug, info};

use skycast_core::DatabaseError;

use crate::schema;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, DatabaseError>;

/// Capacity of the table-changed channel. Slow live queries that fall
/// further behind than this simply re-query once.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Entity tables that publish change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    FavoriteLocations,
    WeatherAlerts,
    Weather,
    Forecast,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::FavoriteLocations => "favorite_locations",
            Table::WeatherAlerts => "weather_alerts",
            Table::Weather => "weather",
            Table::Forecast => "forecast",
        }
    }
}

struct Inner {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<Table>,
}

/// SQLite-backed entity store.
///
/// Cloning is cheap and every clone shares the same connection and change
/// channel. All access goes through [`Database::read`] and
/// [`Database::write`], which run on the blocking pool so async callers never
/// stall their executor thread.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("subscribers", &self.inner.changes.receiver_count())
            .finish()
    }
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DatabaseError::ConnectionFailed(format!(
                        "cannot create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        schema::initialize(&conn)?;

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            inner: Arc::new(Inner {
                conn: Mutex::new(conn),
                changes,
            }),
        })
    }

    /// Run a read-only closure against the connection.
    pub async fn read<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let conn = inner.conn.lock();
            f(&conn)
        })
        .await
        .map_err(|e| DatabaseError::QueryFailed(format!("storage task failed: {e}")))?
    }

    /// Run a mutating closure and, if it succeeds, notify live queries on `table`.
    ///
    /// The event is published from the blocking task itself, after the
    /// statement has committed, so it is sent even if the caller stops
    /// awaiting halfway through.
    pub async fn write<T, F>(&self, table: Table, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let result = {
                let conn = inner.conn.lock();
                f(&conn)
            };
            if result.is_ok() {
                // No receivers just means nobody is observing right now
                let _ = inner.changes.send(table);
                debug!("{} changed", table.name());
            }
            result
        })
        .await
        .map_err(|e| DatabaseError::QueryFailed(format!("storage task failed: {e}")))?
    }

    /// Subscribe to table-changed events.
    pub fn subscribe(&self) -> broadcast::Receiver<Table> {
        self.inner.changes.subscribe()
    }

    /// Number of live subscriptions currently attached.
    pub fn subscriber_count(&self) -> usize {
        self.inner.changes.receiver_count()
    }

    /// Current schema version.
    pub async fn schema_version(&self) -> StoreResult<i32> {
        self.read(|conn| schema::get_schema_version(conn)).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[tokio::test]
    async fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("skycast.db");

        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(db.schema_version().await.unwrap(), schema::SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_write_publishes_only_on_success() {
        let db = Database::open_in_memory().unwrap();
        let mut rx = db.subscribe();

        let failed: StoreResult<()> = db
            .write(Table::Weather, |conn| {
                conn.execute("INSERT INTO no_such_table VALUES (1)", [])?;
                Ok(())
            })
            .await;
        assert!(failed.is_err());
        assert!(rx.try_recv().is_err());

        db.write(Table::Forecast, |conn| {
            conn.execute("DELETE FROM forecast", [])?;
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(rx.try_recv().unwrap(), Table::Forecast);
    }

    #[tokio::test]
    async fn test_subscriber_count_tracks_drops() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.subscriber_count(), 0);

        let rx = db.subscribe();
        assert_eq!(db.subscriber_count(), 1);

        drop(rx);
        assert_eq!(db.subscriber_count(), 0);
    }
}
