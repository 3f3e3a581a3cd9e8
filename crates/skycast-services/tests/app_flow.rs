//! End-to-end flows through `AppServices` with a mocked provider.

use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::StreamExt;
use skycast_core::{AppError, Config, Language, Units, WeatherConfig, WeatherError};
use skycast_services::{AppServices, DataOrigin};
use skycast_store::{AlertKind, Database, FavoriteLocation};
use skycast_weather::{Coordinates, WeatherProvider};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn services_for(server: &MockServer) -> AppServices {
    let weather = WeatherConfig {
        api_key: "test-key".to_string(),
        base_url: server.uri(),
        units: Units::Metric,
        language: Language::En,
        request_timeout_secs: 5,
        max_retries: 0,
    };
    let config = Config {
        weather,
        ..Config::default()
    };
    let provider = WeatherProvider::new(&config.weather).unwrap();

    AppServices::with_parts(
        config,
        Database::open_in_memory().unwrap(),
        Arc::new(provider),
        tokio::runtime::Handle::current(),
    )
}

fn aswan() -> Coordinates {
    Coordinates::new(24.0889, 32.8998)
}

#[tokio::test]
async fn test_fresh_weather_is_cached_then_served_offline() {
    let server = MockServer::start().await;
    let services = services_for(&server);

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "coord": {"lat": 24.0889, "lon": 32.8998},
            "main": {"temp": 41.2, "humidity": 9},
            "dt": 1719835200,
            "name": "Aswan"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let fresh = services.weather().weather_with_fallback(aswan()).await.unwrap();
    assert_eq!(fresh.origin, DataOrigin::Remote);
    assert_eq!(fresh.weather.main.temp, 41.2);

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "cod": 503,
            "message": "service unavailable"
        })))
        .mount(&server)
        .await;

    let offline = services.weather().weather_with_fallback(aswan()).await.unwrap();
    assert!(matches!(offline.origin, DataOrigin::Cache { .. }));
    assert_eq!(offline.weather.name, "Aswan");
    assert_eq!(offline.updated_at, fresh.updated_at);
}

fn rejection(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(serde_json::json!({
        "cod": status,
        "message": message
    }))
}

#[tokio::test]
async fn test_rejected_request_is_served_from_cache() {
    let cases = [
        (401, "Invalid API key", "Invalid API key"),
        (404, "city not found", "Location not found"),
    ];

    for (status, message, expected) in cases {
        let server = MockServer::start().await;
        let services = services_for(&server);
        services
            .weather()
            .save_weather(skycast_weather::WeatherResponse {
                name: "Aswan".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(rejection(status, message))
            .mount(&server)
            .await;

        let snapshot = services.weather().weather_with_fallback(aswan()).await.unwrap();
        assert_eq!(snapshot.weather.name, "Aswan");
        match snapshot.origin {
            DataOrigin::Cache { remote_error } => {
                assert!(remote_error.starts_with(expected), "{status}: {remote_error}");
            }
            DataOrigin::Remote => panic!("{status} served as live weather"),
        }
    }
}

#[tokio::test]
async fn test_rejected_request_without_cache_reports_no_data() {
    let server = MockServer::start().await;
    let services = services_for(&server);

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(rejection(401, "Invalid API key"))
        .mount(&server)
        .await;

    let err = services.weather().weather_with_fallback(aswan()).await.unwrap_err();
    assert!(matches!(err, AppError::Weather(WeatherError::NoCachedData)));
}

#[tokio::test]
async fn test_favorites_and_alerts_flow() {
    let server = MockServer::start().await;
    let services = services_for(&server);

    let mut favorites = services.favorites().get_all();
    assert!(favorites.next().await.unwrap().unwrap().is_empty());

    let id = services
        .favorites()
        .add(FavoriteLocation::new(24.0889, 32.8998).with_names("أسوان", "Aswan"))
        .await
        .unwrap();
    let listed = favorites.next().await.unwrap().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].display_name(Language::Ar), "أسوان");
    assert!(services.favorites().is_favorite(id).await.unwrap());

    let scheduler = services.scheduler();
    let alert = scheduler
        .add(Utc::now() + Duration::hours(6), AlertKind::Alarm)
        .await
        .unwrap();
    assert!(scheduler.disable(&alert.id).await.unwrap());
    assert!(services.alerts().get_active().await.unwrap().is_empty());

    services.shutdown();
}
