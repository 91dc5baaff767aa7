//! One forecast email, start to finish.

use anyhow::{Context, Result};
use forecast_auth::{
    Authorizer, BrowserAuthorizer, CredentialManager, GoogleOAuth2Provider, TokenStore,
};
use forecast_core::Config;
use forecast_gmail::{EmailComposer, EmailSender};
use forecast_weather::{Forecast, WeatherClient};

/// Run the pipeline with the interactive browser flow as the fallback authorizer.
pub async fn run(config: &Config) -> Result<bool> {
    let provider = GoogleOAuth2Provider::from_config(&config.google);
    run_with(config, BrowserAuthorizer::new(&config.google, provider)).await
}

/// Credential, fetch, extract, compose, send. Each step runs to completion
/// before the next one starts.
///
/// Returns whether Gmail accepted the message. Every other failure is an error.
pub async fn run_with<A: Authorizer>(config: &Config, authorizer: A) -> Result<bool> {
    let credentials = CredentialManager::new(
        TokenStore::new(&config.google.token_path),
        GoogleOAuth2Provider::from_config(&config.google),
        authorizer,
    );
    let token = credentials.obtain().await.context("Failed to obtain Gmail credential")?;

    let weather = WeatherClient::new(&config.weather)?;
    let raw = weather
        .fetch(&config.weather.location)
        .await
        .with_context(|| format!("Failed to fetch forecast for {}", config.weather.location))?;
    let forecast = Forecast::extract(&raw).context("Failed to read forecast")?;
    tracing::info!(
        "Forecast: {} (high {}, low {}, precip {})",
        forecast.condition(),
        forecast.max_temp(),
        forecast.min_temp(),
        forecast.total_precip()
    );

    let message = EmailComposer::new(&config.mail)
        .compose(&forecast)
        .context("Failed to compose forecast email")?;

    EmailSender::new(&config.mail.gmail_base_url).send(&message, &token).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use base64::Engine;
    use forecast_auth::TokenSet;
    use std::cell::Cell;
    use std::fs;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Stands in for the browser: hands out a fixed token and counts calls.
    struct CannedAuthorizer<'a> {
        calls: &'a Cell<usize>,
    }

    impl Authorizer for CannedAuthorizer<'_> {
        async fn authorize(&self) -> Result<TokenSet> {
            self.calls.set(self.calls.get() + 1);
            Ok(TokenSet {
                access_token: "fresh_access".to_string(),
                refresh_token: Some("fresh_refresh".to_string()),
                expires_at: unix_now() + 3600,
                scopes: vec![],
            })
        }
    }

    fn unix_now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    struct Harness {
        dir: tempfile::TempDir,
        weather: MockServer,
        gmail: MockServer,
        config: Config,
    }

    async fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let weather = MockServer::start().await;
        let gmail = MockServer::start().await;

        let template_path = dir.path().join("forecast.html");
        fs::write(
            &template_path,
            "<p>{{ condition }}: {{ max_temp }}/{{ min_temp }}, {{ total_precip }} in</p>\
             <img src=\"cid:forecast-icon\">",
        )
        .unwrap();
        let icon_dir = dir.path().join("icons");
        fs::create_dir_all(icon_dir.join("64x64").join("day")).unwrap();
        fs::write(icon_dir.join("64x64").join("day").join("113.png"), b"\x89PNG").unwrap();

        let mut config = Config::default();
        config.weather.api_key = "weather_key".to_string();
        config.weather.location = "10001".to_string();
        config.weather.base_url = weather.uri();
        config.mail.sender = "me@example.com".to_string();
        config.mail.recipient = "you@example.com".to_string();
        config.mail.template_path = template_path;
        config.mail.icon_dir = icon_dir;
        config.mail.gmail_base_url = gmail.uri();
        config.google.client_id = "client".to_string();
        config.google.client_secret = "secret".to_string();
        config.google.token_url = format!("{}/token", gmail.uri());
        config.google.token_path = dir.path().join("token.json");

        Harness {
            dir,
            weather,
            gmail,
            config,
        }
    }

    async fn sunny_forecast(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/v1/forecast.json"))
            .and(query_param("q", "10001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "location": {"name": "New York"},
                "forecast": {"forecastday": [{"day": {
                    "mintemp_f": 50.0,
                    "maxtemp_f": 68.0,
                    "totalprecip_in": 0.0,
                    "condition": {"text": "Sunny", "icon": "//cdn.weatherapi.com/weather/64x64/day/113.png"}
                }}]}
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    async fn gmail_send(server: &MockServer, status: u16, bearer: &str) {
        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/messages/send"))
            .and(header("Authorization", format!("Bearer {}", bearer).as_str()))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(serde_json::json!({"id": "sent1"})),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    fn store_valid_token(h: &Harness) {
        TokenStore::new(&h.config.google.token_path)
            .save(&TokenSet {
                access_token: "cached_access".to_string(),
                refresh_token: Some("cached_refresh".to_string()),
                expires_at: unix_now() + 3600,
                scopes: vec![],
            })
            .unwrap();
    }

    #[tokio::test]
    async fn test_sends_forecast_with_cached_credential() {
        let h = harness().await;
        store_valid_token(&h);
        sunny_forecast(&h.weather).await;
        gmail_send(&h.gmail, 200, "cached_access").await;

        let calls = Cell::new(0);
        let sent = run_with(&h.config, CannedAuthorizer { calls: &calls }).await.unwrap();

        assert!(sent);
        assert_eq!(calls.get(), 0);

        let requests = h.gmail.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let raw = body["raw"].as_str().unwrap();
        let mime = base64::engine::general_purpose::URL_SAFE.decode(raw).unwrap();
        let mime = String::from_utf8(mime).unwrap();
        assert!(mime.contains("To: you@example.com"));
        assert!(mime.contains("Subject: Today's Forecast"));
        assert!(mime.contains("Content-ID: <forecast-icon>"));
    }

    #[tokio::test]
    async fn test_first_run_authorizes_and_caches() {
        let h = harness().await;
        sunny_forecast(&h.weather).await;
        gmail_send(&h.gmail, 200, "fresh_access").await;

        let calls = Cell::new(0);
        let sent = run_with(&h.config, CannedAuthorizer { calls: &calls }).await.unwrap();

        assert!(sent);
        assert_eq!(calls.get(), 1);
        let cached = TokenStore::new(&h.config.google.token_path).load().unwrap().unwrap();
        assert_eq!(cached.access_token, "fresh_access");
        assert!(h.dir.path().join("token.json").is_file());
    }

    #[tokio::test]
    async fn test_rejected_send_reports_false() {
        let h = harness().await;
        store_valid_token(&h);
        sunny_forecast(&h.weather).await;
        gmail_send(&h.gmail, 403, "cached_access").await;

        let calls = Cell::new(0);
        let sent = run_with(&h.config, CannedAuthorizer { calls: &calls }).await.unwrap();

        assert!(!sent);
    }

    #[tokio::test]
    async fn test_weather_failure_is_fatal_and_nothing_is_sent() {
        let h = harness().await;
        store_valid_token(&h);
        Mock::given(method("GET"))
            .and(path("/v1/forecast.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&h.weather)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&h.gmail)
            .await;

        let calls = Cell::new(0);
        let err = run_with(&h.config, CannedAuthorizer { calls: &calls }).await.unwrap_err();

        assert!(format!("{:#}", err).contains("Failed to fetch forecast for 10001"));
    }

    #[tokio::test]
    async fn test_missing_icon_is_fatal() {
        let h = harness().await;
        store_valid_token(&h);
        fs::remove_file(h.config.mail.icon_dir.join("64x64").join("day").join("113.png")).unwrap();
        sunny_forecast(&h.weather).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&h.gmail)
            .await;

        let calls = Cell::new(0);
        let err = run_with(&h.config, CannedAuthorizer { calls: &calls }).await.unwrap_err();

        let io = err.chain().find_map(|c| c.downcast_ref::<std::io::Error>()).unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
    }
}
