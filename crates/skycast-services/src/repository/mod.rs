//! Repositories: the only entry points the rest of the app uses for data.

mod alerts;
mod favorites;
mod weather;

pub use alerts::WeatherAlertsRepository;
pub use favorites::FavoriteLocationsRepository;
pub use weather::{DataOrigin, WeatherRepository, WeatherSnapshot};
