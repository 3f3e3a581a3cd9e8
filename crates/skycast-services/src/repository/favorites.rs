use std::sync::Arc;

use futures::stream::BoxStream;
use tracing::debug;

use skycast_store::{FavoriteLocation, StoreResult};

use crate::local::FavoritesLocalDataSource;

/// Saved map locations.
#[derive(Clone)]
pub struct FavoriteLocationsRepository {
    source: Arc<dyn FavoritesLocalDataSource>,
}

impl FavoriteLocationsRepository {
    pub fn new(source: Arc<dyn FavoritesLocalDataSource>) -> Self {
        Self { source }
    }

    /// Live list of every favorite, ordered by id.
    pub fn get_all(&self) -> BoxStream<'static, StoreResult<Vec<FavoriteLocation>>> {
        self.source.observe_all()
    }

    /// Save a favorite and return its id. Saving an existing id replaces it.
    pub async fn add(&self, location: FavoriteLocation) -> StoreResult<i64> {
        let id = self.source.insert(location).await?;
        debug!("Saved favorite {}", id);
        Ok(id)
    }

    pub async fn remove(&self, location: &FavoriteLocation) -> StoreResult<()> {
        self.source.delete(location.id).await?;
        debug!("Removed favorite {}", location.id);
        Ok(())
    }

    /// Rows changed; 0 when no favorite has this id.
    pub async fn update(&self, location: FavoriteLocation) -> StoreResult<usize> {
        let changed = self.source.update(location).await?;
        if changed == 0 {
            debug!("Favorite update matched no rows");
        }
        Ok(changed)
    }

    pub async fn is_favorite(&self, id: i64) -> StoreResult<bool> {
        self.source.exists(id).await
    }
}
