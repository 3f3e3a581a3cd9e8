use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;

use skycast_core::Config;
use skycast_services::{AppServices, DataOrigin, LogPresenter};
use skycast_weather::Coordinates;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    skycast_core::init()?;

    let (config, _) = Config::load_validated()?;
    tracing::info!("Data directory: {}", config.data_dir.display());

    let services = AppServices::global(config, tokio::runtime::Handle::current())?;
    let rearmed = services.start().await?;
    services.spawn_alert_receiver(Arc::new(LogPresenter));

    tracing::info!("SkyCast started; {} alert timers armed", rearmed);

    let favorites = services
        .favorites()
        .get_all()
        .next()
        .await
        .transpose()?
        .unwrap_or_default();
    for favorite in &favorites {
        tracing::info!(
            "Favorite #{}: {}",
            favorite.id,
            favorite.display_name(services.config().weather.language)
        );
    }

    for alert in services.alerts().get_active().await? {
        tracing::info!("Active {} alert {} at {}", alert.kind, alert.id, alert.trigger_time);
    }

    if services.config().weather.has_api_key() {
        let here = favorites
            .first()
            .map(|f| f.coordinates())
            .unwrap_or(Coordinates::new(30.0444, 31.2357));
        match services.weather().weather_with_fallback(here).await {
            Ok(snapshot) => {
                let origin = match &snapshot.origin {
                    DataOrigin::Remote => "live",
                    DataOrigin::Cache { remote_error } => {
                        tracing::warn!("Provider failed, showing cached weather: {}", remote_error);
                        "cached"
                    }
                };
                tracing::info!(
                    "{} weather for {}: {:.1}° as of {}",
                    origin,
                    snapshot.weather.location_label(),
                    snapshot.weather.main.temp,
                    snapshot.updated_at
                );
            }
            Err(e) => tracing::warn!("Weather unavailable: {}", e.user_message()),
        }
    }

    tokio::signal::ctrl_c().await?;

    // Graceful shutdown
    services.shutdown();
    Ok(())
}
