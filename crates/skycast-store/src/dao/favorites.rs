use rusqlite::{params, Connection, OptionalExtension};

use crate::database::{Database, StoreResult, Table};
use crate::entities::FavoriteLocation;
use crate::live::LiveQuery;

const COLUMNS: &str = "id, latitude, longitude, cityNameAr, cityNameEn";

/// Access to `favorite_locations`.
#[derive(Debug, Clone)]
pub struct FavoritesDao {
    db: Database,
}

impl FavoritesDao {
    pub(crate) fn new(db: Database) -> Self {
        Self { db }
    }

    fn row_to_favorite(row: &rusqlite::Row) -> rusqlite::Result<FavoriteLocation> {
        Ok(FavoriteLocation {
            id: row.get(0)?,
            latitude: row.get(1)?,
            longitude: row.get(2)?,
            city_name_ar: row.get(3)?,
            city_name_en: row.get(4)?,
        })
    }

    fn list(conn: &Connection) -> StoreResult<Vec<FavoriteLocation>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM favorite_locations ORDER BY id"
        ))?;
        let rows = stmt.query_map([], Self::row_to_favorite)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Insert or replace a favorite. An id of 0 gets a fresh one.
    ///
    /// Returns the stored id.
    pub async fn insert(&self, favorite: FavoriteLocation) -> StoreResult<i64> {
        self.db
            .write(Table::FavoriteLocations, move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO favorite_locations (id, latitude, longitude, cityNameAr, cityNameEn)
                     VALUES (NULLIF(?1, 0), ?2, ?3, ?4, ?5)",
                    params![
                        favorite.id,
                        favorite.latitude,
                        favorite.longitude,
                        favorite.city_name_ar,
                        favorite.city_name_en
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    /// Overwrite the row with the favorite's id. Returns rows affected.
    pub async fn update(&self, favorite: FavoriteLocation) -> StoreResult<usize> {
        self.db
            .write(Table::FavoriteLocations, move |conn| {
                Ok(conn.execute(
                    "UPDATE favorite_locations
                     SET latitude = ?2, longitude = ?3, cityNameAr = ?4, cityNameEn = ?5
                     WHERE id = ?1",
                    params![
                        favorite.id,
                        favorite.latitude,
                        favorite.longitude,
                        favorite.city_name_ar,
                        favorite.city_name_en
                    ],
                )?)
            })
            .await
    }

    /// Delete by id. Returns rows affected.
    pub async fn delete(&self, id: i64) -> StoreResult<usize> {
        self.db
            .write(Table::FavoriteLocations, move |conn| {
                Ok(conn.execute("DELETE FROM favorite_locations WHERE id = ?1", params![id])?)
            })
            .await
    }

    pub async fn exists(&self, id: i64) -> StoreResult<bool> {
        self.db
            .read(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM favorite_locations WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await
    }

    pub async fn get(&self, id: i64) -> StoreResult<Option<FavoriteLocation>> {
        self.db
            .read(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {COLUMNS} FROM favorite_locations WHERE id = ?1"),
                        params![id],
                        Self::row_to_favorite,
                    )
                    .optional()?)
            })
            .await
    }

    pub async fn get_all(&self) -> StoreResult<Vec<FavoriteLocation>> {
        self.db.read(Self::list).await
    }

    /// Every favorite ordered by id, re-emitted on each change.
    pub fn observe_all(&self) -> LiveQuery<Vec<FavoriteLocation>> {
        LiveQuery::new(self.db.clone(), &[Table::FavoriteLocations], Self::list)
    }
}
