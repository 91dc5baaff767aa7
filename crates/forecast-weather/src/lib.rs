//! Weather data for the daily forecast email.
//!
//! Fetches one day of forecast from WeatherAPI.com and narrows it down to the
//! handful of fields the email displays.

pub mod provider;
pub mod types;

pub use provider::WeatherClient;
pub use types::{Forecast, RawForecastResponse, WeatherError};
