use serde::{Deserialize, Serialize};

/// Raw forecast JSON as returned by the provider.
///
/// Only [`Forecast::extract`] looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawForecastResponse(serde_json::Value);

impl RawForecastResponse {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<serde_json::Value> for RawForecastResponse {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// The subset of `forecast.json` the email needs.
#[derive(Debug, Deserialize)]
struct ApiForecastResponse {
    forecast: ApiForecast,
}

#[derive(Debug, Deserialize)]
struct ApiForecast {
    forecastday: Vec<ApiForecastDay>,
}

#[derive(Debug, Deserialize)]
struct ApiForecastDay {
    day: ApiDay,
}

#[derive(Debug, Deserialize)]
struct ApiDay {
    mintemp_f: f64,
    maxtemp_f: f64,
    totalprecip_in: f64,
    condition: ApiCondition,
}

#[derive(Debug, Deserialize)]
struct ApiCondition {
    text: String,
    /// e.g. `//cdn.weatherapi.com/weather/64x64/day/113.png`
    icon: String,
}

/// Minimal weather info displayed in the email.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    min_temp: f64,
    max_temp: f64,
    total_precip: f64,
    condition: String,
    icon_filename: String,
}

impl Forecast {
    pub fn new(
        min_temp: f64,
        max_temp: f64,
        total_precip: f64,
        condition: impl Into<String>,
        icon_filename: impl Into<String>,
    ) -> Self {
        Self {
            min_temp,
            max_temp,
            total_precip,
            condition: condition.into(),
            icon_filename: icon_filename.into(),
        }
    }

    /// Build a forecast from the first day of a provider response.
    ///
    /// Fails as a whole if any consumed field is missing or mistyped. The icon
    /// reference keeps only its last path segment; the file itself is not
    /// checked here.
    pub fn extract(raw: &RawForecastResponse) -> Result<Self, WeatherError> {
        let response = ApiForecastResponse::deserialize(raw.as_value())
            .map_err(|e| WeatherError::Parse(e.to_string()))?;

        let day = response
            .forecast
            .forecastday
            .into_iter()
            .next()
            .ok_or(WeatherError::MissingForecastDay)?
            .day;

        let icon_filename = icon_filename(&day.condition.icon).ok_or_else(|| {
            WeatherError::Parse(format!("icon reference has no filename: {}", day.condition.icon))
        })?;

        Ok(Self::new(
            day.mintemp_f,
            day.maxtemp_f,
            day.totalprecip_in,
            day.condition.text,
            icon_filename,
        ))
    }

    /// Daily low (°F)
    pub fn min_temp(&self) -> f64 {
        self.min_temp
    }

    /// Daily high (°F)
    pub fn max_temp(&self) -> f64 {
        self.max_temp
    }

    /// Accumulated precipitation (in)
    pub fn total_precip(&self) -> f64 {
        self.total_precip
    }

    /// Such as "Partly Cloudy" or "Sunny"
    pub fn condition(&self) -> &str {
        &self.condition
    }

    pub fn icon_filename(&self) -> &str {
        &self.icon_filename
    }
}

fn icon_filename(reference: &str) -> Option<&str> {
    reference.rsplit('/').next().filter(|name| !name.is_empty())
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Weather API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected forecast shape: {0}")]
    Parse(String),

    #[error("Forecast response contains no forecast day")]
    MissingForecastDay,
}
