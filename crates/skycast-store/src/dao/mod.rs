//! Data access objects, one per entity table.

mod alerts;
mod favorites;
mod weather;

pub use alerts::AlertsDao;
pub use favorites::FavoritesDao;
pub use weather::WeatherCacheDao;

use crate::database::Database;

impl Database {
    pub fn favorites(&self) -> FavoritesDao {
        FavoritesDao::new(self.clone())
    }

    pub fn alerts(&self) -> AlertsDao {
        AlertsDao::new(self.clone())
    }

    pub fn weather_cache(&self) -> WeatherCacheDao {
        WeatherCacheDao::new(self.clone())
    }
}
