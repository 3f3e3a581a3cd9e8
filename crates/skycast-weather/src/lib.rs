//! Weather provider client for SkyCast
//!
//! Typed payloads for the current-weather and forecast endpoints and the
//! remote data source that fetches them.

pub mod provider;
pub mod retry;
pub mod types;

pub use provider::{WeatherProvider, WeatherRemoteDataSource};
pub use retry::RetryConfig;
pub use types::*;
