//! Database schema and versioned migrations.
//!
//! Every version bump is listed in [`MIGRATIONS`] with an explicit strategy:
//! an additive statement that keeps existing rows, or a rebuild that drops
//! every entity table and recreates the current schema.

use rusqlite::{Connection, OptionalExtension};
use tracing::{info, warn};

use skycast_core::DatabaseError;

use crate::database::StoreResult;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 3;

/// How a single version transition is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStep {
    /// In-place change; existing rows survive.
    Additive(&'static str),
    /// Drop all entity tables and recreate the current schema. Data is lost.
    Rebuild,
}

/// Transition from `version - 1` to `version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub version: i32,
    pub step: MigrationStep,
}

const ALERTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS weather_alerts (
        id TEXT PRIMARY KEY NOT NULL,
        triggerTime INTEGER NOT NULL,
        alertType TEXT NOT NULL,
        isActive INTEGER NOT NULL DEFAULT 1
    );
"#;

/// Known transitions, in ascending order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 2,
        step: MigrationStep::Additive(
            "ALTER TABLE weather ADD COLUMN lastUpdated INTEGER NOT NULL DEFAULT 0;",
        ),
    },
    Migration {
        version: 3,
        step: MigrationStep::Additive(ALERTS_TABLE),
    },
];

const ENTITY_TABLES: &[&str] = &["favorite_locations", "weather_alerts", "weather", "forecast"];

/// Initialize the database schema, migrating older databases in place.
pub fn initialize(conn: &Connection) -> StoreResult<()> {
    migrate(conn, SCHEMA_VERSION, MIGRATIONS)
}

/// Bring the database to `target` using `migrations`.
pub fn migrate(conn: &Connection, target: i32, migrations: &[Migration]) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );",
    )?;

    let version = get_schema_version(conn)?;

    if version == 0 {
        let tx = conn.unchecked_transaction()?;
        create_current_schema(&tx)?;
        set_schema_version(&tx, target)?;
        tx.commit()?;
        info!("Created schema version {}", target);
        return Ok(());
    }

    if version == target {
        return Ok(());
    }

    if version > target {
        warn!(
            "Database schema version {} is newer than supported {}; rebuilding",
            version, target
        );
        return rebuild(conn, target);
    }

    let mut current = version;
    while current < target {
        let next = current + 1;
        let migration = migrations
            .iter()
            .find(|m| m.version == next)
            .ok_or_else(|| {
                DatabaseError::MigrationFailed(format!(
                    "no migration declared for version {} -> {}",
                    current, next
                ))
            })?;

        match migration.step {
            MigrationStep::Additive(sql) => {
                let tx = conn.unchecked_transaction()?;
                tx.execute_batch(sql).map_err(|e| {
                    DatabaseError::MigrationFailed(format!("version {}: {}", next, e))
                })?;
                set_schema_version(&tx, next)?;
                tx.commit()?;
                info!("Migrated schema {} -> {}", current, next);
                current = next;
            }
            MigrationStep::Rebuild => {
                // The rebuilt schema is already the current one
                return rebuild(conn, target);
            }
        }
    }

    Ok(())
}

/// Drop every entity table, recreate the current schema and record `version`.
fn rebuild(conn: &Connection, version: i32) -> StoreResult<()> {
    let tx = conn.unchecked_transaction()?;
    for table in ENTITY_TABLES {
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
    }
    create_current_schema(&tx)?;
    set_schema_version(&tx, version)?;
    tx.commit()?;
    warn!("Rebuilt schema at version {}; previous rows were dropped", version);
    Ok(())
}

/// Get the current schema version (0 for a fresh database).
pub fn get_schema_version(conn: &Connection) -> StoreResult<i32> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()?;

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> StoreResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
        [version],
    )?;
    Ok(())
}

fn create_current_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS favorite_locations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            cityNameAr TEXT NOT NULL DEFAULT '',
            cityNameEn TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS weather (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            weatherResponse TEXT NOT NULL,
            locationName TEXT NOT NULL DEFAULT '',
            lastUpdated INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS forecast (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            forecastResponse TEXT NOT NULL
        );
        "#,
    )?;
    conn.execute_batch(ALERTS_TABLE)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn column_names(conn: &Connection, table: &str) -> Vec<String> {
        conn.prepare(&format!("PRAGMA table_info({table})"))
            .unwrap()
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    /// The first released schema: no lastUpdated, no alerts.
    fn create_v1(conn: &Connection) {
        conn.execute_batch(
            r#"
            CREATE TABLE schema_version (id INTEGER PRIMARY KEY CHECK (id = 1), version INTEGER NOT NULL);
            INSERT INTO schema_version (id, version) VALUES (1, 1);
            CREATE TABLE favorite_locations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                cityNameAr TEXT NOT NULL DEFAULT '',
                cityNameEn TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE weather (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                weatherResponse TEXT NOT NULL,
                locationName TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE forecast (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                forecastResponse TEXT NOT NULL
            );
            INSERT INTO weather (weatherResponse, locationName) VALUES ('{}', 'Cairo');
            INSERT INTO favorite_locations (latitude, longitude, cityNameEn) VALUES (30.0, 31.2, 'Cairo');
            "#,
        )
        .unwrap();
    }

    #[test]
    fn test_initialize_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let tables = table_names(&conn);
        for table in ENTITY_TABLES {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
        assert!(tables.contains(&"schema_version".to_string()));
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn.execute(
            "INSERT INTO favorite_locations (latitude, longitude) VALUES (1.0, 2.0)",
            [],
        )
        .unwrap();

        initialize(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM favorite_locations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_additive_migrations_keep_rows() {
        let conn = Connection::open_in_memory().unwrap();
        create_v1(&conn);

        initialize(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(column_names(&conn, "weather").contains(&"lastUpdated".to_string()));
        assert!(table_names(&conn).contains(&"weather_alerts".to_string()));

        let (name, last_updated): (String, i64) = conn
            .query_row("SELECT locationName, lastUpdated FROM weather", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(name, "Cairo");
        assert_eq!(last_updated, 0);

        let favorites: i64 = conn
            .query_row("SELECT COUNT(*) FROM favorite_locations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(favorites, 1);
    }

    #[test]
    fn test_rebuild_step_drops_rows() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn.execute(
            "INSERT INTO favorite_locations (latitude, longitude) VALUES (1.0, 2.0)",
            [],
        )
        .unwrap();

        let mut migrations = MIGRATIONS.to_vec();
        migrations.push(Migration {
            version: SCHEMA_VERSION + 1,
            step: MigrationStep::Rebuild,
        });
        migrate(&conn, SCHEMA_VERSION + 1, &migrations).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION + 1);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM favorite_locations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_newer_database_is_rebuilt() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn.execute("INSERT INTO forecast (forecastResponse) VALUES ('{}')", [])
            .unwrap();
        set_schema_version(&conn, SCHEMA_VERSION + 5).unwrap();

        initialize(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM forecast", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_undeclared_version_bump_fails() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let err = migrate(&conn, SCHEMA_VERSION + 1, MIGRATIONS).unwrap_err();
        assert!(matches!(err, DatabaseError::MigrationFailed(_)));
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }
}
