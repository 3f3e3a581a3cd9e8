use std::sync::Arc;

use futures::stream::BoxStream;

use skycast_store::{StoreResult, WeatherAlert};

use crate::local::AlertsLocalDataSource;

/// Saved weather alerts.
#[derive(Clone)]
pub struct WeatherAlertsRepository {
    source: Arc<dyn AlertsLocalDataSource>,
}

impl WeatherAlertsRepository {
    pub fn new(source: Arc<dyn AlertsLocalDataSource>) -> Self {
        Self { source }
    }

    /// Live list of every alert, ordered by trigger time.
    pub fn get_all(&self) -> BoxStream<'static, StoreResult<Vec<WeatherAlert>>> {
        self.source.observe_all()
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<WeatherAlert>> {
        self.source.get(id).await
    }

    pub async fn get_active(&self) -> StoreResult<Vec<WeatherAlert>> {
        self.source.get_active().await
    }

    pub async fn add(&self, alert: WeatherAlert) -> StoreResult<()> {
        self.source.insert(alert).await
    }

    /// Rows removed; 0 when no alert has this id.
    pub async fn delete(&self, id: &str) -> StoreResult<usize> {
        self.source.delete(id).await
    }

    /// Rows changed; 0 when no alert has this id.
    pub async fn update_status(&self, id: &str, active: bool) -> StoreResult<usize> {
        self.source.update_status(id, active).await
    }

    /// Turn an active alert off in a single conditional write.
    ///
    /// Returns `true` only for the call that made the change.
    pub async fn deactivate(&self, id: &str) -> StoreResult<bool> {
        self.source.deactivate(id).await
    }

    /// Rows changed; 0 when no alert has this id.
    pub async fn update(&self, alert: WeatherAlert) -> StoreResult<usize> {
        self.source.update(alert).await
    }
}
