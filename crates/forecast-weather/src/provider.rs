use forecast_core::WeatherConfig;
use reqwest::Client;
use std::time::Duration;
use tracing::instrument;

use crate::types::{RawForecastResponse, WeatherError};

const USER_AGENT: &str = concat!("forecast-mailer/", env!("CARGO_PKG_VERSION"));

/// WeatherAPI.com forecast client
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl WeatherClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if config.timeout_seconds > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_seconds));
        }

        Ok(Self {
            client: builder.build()?,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch today's forecast for `location` (no air quality, no alerts).
    ///
    /// Any transport error or non-2xx status is returned as-is; nothing is retried.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch(&self, location: &str) -> Result<RawForecastResponse, WeatherError> {
        let url = format!("{}/v1/forecast.json", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", location),
                ("days", "1"),
                ("aqi", "no"),
                ("alerts", "no"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WeatherError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = response.json().await?;
        tracing::debug!("Fetched forecast for {}", location);
        Ok(RawForecastResponse::new(body))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::Forecast;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> WeatherConfig {
        WeatherConfig {
            api_key: "test_key".to_string(),
            location: "10001".to_string(),
            base_url: base_url.to_string(),
            timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn test_fetch_sends_expected_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast.json"))
            .and(query_param("key", "test_key"))
            .and(query_param("q", "10001"))
            .and(query_param("days", "1"))
            .and(query_param("aqi", "no"))
            .and(query_param("alerts", "no"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "forecast": {"forecastday": [{"day": {
                    "mintemp_f": 50.0, "maxtemp_f": 68.0, "totalprecip_in": 0.0,
                    "condition": {"text": "Sunny", "icon": "//cdn/64x64/day/113.png"}
                }}]}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = WeatherClient::new(&config(&mock_server.uri())).unwrap();
        let raw = client.fetch("10001").await.unwrap();

        let forecast = Forecast::extract(&raw).unwrap();
        assert_eq!(forecast.condition(), "Sunny");
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast.json"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"code": 2006, "message": "API key is invalid."}
            })))
            .mount(&mock_server)
            .await;

        let client = WeatherClient::new(&config(&mock_server.uri())).unwrap();
        let result = client.fetch("10001").await;

        match result {
            Err(WeatherError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert!(message.contains("API key is invalid"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_non_json_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let client = WeatherClient::new(&config(&mock_server.uri())).unwrap();
        assert!(matches!(client.fetch("10001").await, Err(WeatherError::Network(_))));
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let base = format!("{}/", mock_server.uri());
        let client = WeatherClient::new(&config(&base)).unwrap();
        assert!(client.fetch("10001").await.is_ok());
    }
}
