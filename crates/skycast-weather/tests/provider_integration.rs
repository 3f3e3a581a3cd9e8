//! Integration tests for WeatherProvider using wiremock.

use skycast_core::{Language, Units, WeatherConfig, WeatherError};
use skycast_weather::{Coordinates, RetryConfig, WeatherProvider, WeatherRemoteDataSource};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_for(server: &MockServer) -> WeatherProvider {
    let config = WeatherConfig {
        api_key: "test-key".to_string(),
        base_url: server.uri(),
        units: Units::Metric,
        language: Language::Ar,
        request_timeout_secs: 5,
        max_retries: 0,
    };
    WeatherProvider::new(&config).unwrap()
}

fn cairo() -> Coordinates {
    Coordinates::new(30.0444, 31.2357)
}

fn current_body() -> serde_json::Value {
    serde_json::json!({
        "coord": {"lon": 31.2357, "lat": 30.0444},
        "weather": [{"id": 800, "main": "Clear", "description": "سماء صافية", "icon": "01d"}],
        "main": {"temp": 31.5, "feels_like": 30.9, "temp_min": 30.0, "temp_max": 33.1, "pressure": 1011, "humidity": 28},
        "wind": {"speed": 4.6, "deg": 350},
        "clouds": {"all": 0},
        "dt": 1719835200,
        "timezone": 10800,
        "name": "Cairo"
    })
}

#[tokio::test]
async fn test_current_weather_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "30.0444"))
        .and(query_param("lon", "31.2357"))
        .and(query_param("appid", "test-key"))
        .and(query_param("units", "metric"))
        .and(query_param("lang", "ar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .expect(1)
        .mount(&server)
        .await;

    let weather = provider_for(&server).current_weather(cairo()).await.unwrap();

    assert_eq!(weather.name, "Cairo");
    assert_eq!(weather.main.temp, 31.5);
    assert_eq!(weather.condition().unwrap().icon, "01d");
}

#[tokio::test]
async fn test_forecast_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "cod": "200",
            "cnt": 2,
            "list": [
                {"dt": 1719835200, "main": {"temp": 30.0, "temp_min": 29.0, "temp_max": 31.0}, "weather": [{"icon": "01d"}], "pop": 0.0, "dt_txt": "2024-07-01 12:00:00"},
                {"dt": 1719846000, "main": {"temp": 28.0, "temp_min": 27.0, "temp_max": 28.5}, "weather": [{"icon": "01n"}], "pop": 0.1, "dt_txt": "2024-07-01 15:00:00"}
            ],
            "city": {"id": 360630, "name": "Cairo", "coord": {"lat": 30.0444, "lon": 31.2357}, "country": "EG", "timezone": 10800}
        })))
        .mount(&server)
        .await;

    let forecast = provider_for(&server).forecast(cairo()).await.unwrap();

    assert_eq!(forecast.list.len(), 2);
    assert_eq!(forecast.city.name, "Cairo");
    assert_eq!(forecast.daily().len(), 1);
}

#[tokio::test]
async fn test_unauthorized_maps_to_invalid_api_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "cod": 401,
            "message": "Invalid API key."
        })))
        .mount(&server)
        .await;

    let err = provider_for(&server).current_weather(cairo()).await.unwrap_err();
    assert!(matches!(err, WeatherError::InvalidApiKey));
}

#[tokio::test]
async fn test_not_found_maps_to_location_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "cod": "404",
            "message": "city not found"
        })))
        .mount(&server)
        .await;

    let err = provider_for(&server).forecast(cairo()).await.unwrap_err();
    assert!(matches!(err, WeatherError::LocationNotFound(_)));
}

#[tokio::test]
async fn test_server_error_carries_status_and_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "cod": 503,
            "message": "maintenance"
        })))
        .mount(&server)
        .await;

    let err = provider_for(&server).current_weather(cairo()).await.unwrap_err();
    match err {
        WeatherError::ApiError { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .mount(&server)
        .await;

    let provider = provider_for(&server).with_retry_config(RetryConfig::new(2, 1, 5));
    let weather = provider.current_weather(cairo()).await.unwrap();
    assert_eq!(weather.name, "Cairo");
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = provider_for(&server).current_weather(cairo()).await.unwrap_err();
    assert!(matches!(err, WeatherError::Parse(_)));
}

#[tokio::test]
async fn test_unreachable_host_is_network_failure() {
    let config = WeatherConfig {
        api_key: "test-key".to_string(),
        base_url: "http://127.0.0.1:9".to_string(),
        request_timeout_secs: 2,
        max_retries: 0,
        ..WeatherConfig::default()
    };
    let provider = WeatherProvider::new(&config).unwrap();

    let err = provider.current_weather(cairo()).await.unwrap_err();
    assert!(err.is_network_failure(), "unexpected error: {err:?}");
}
