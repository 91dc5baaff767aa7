//! Google token endpoint: authorization-code exchange and refresh.

use anyhow::{Context, Result};
use forecast_core::GoogleConfig;
use serde::{Deserialize, Serialize};

use crate::storage::TokenSet;

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_EXPIRES_IN: u64 = 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}

fn default_expires_in() -> u64 {
    DEFAULT_EXPIRES_IN
}

impl GoogleTokenResponse {
    /// Convert to a storable token set.
    ///
    /// Refresh responses usually omit the refresh token, so `previous_refresh`
    /// is carried over in that case.
    pub fn into_token_set(self, previous_refresh: Option<String>) -> TokenSet {
        let expires_at = chrono::Utc::now().timestamp() + self.expires_in as i64;
        TokenSet {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at,
            scopes: self.scope.split_whitespace().map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoogleOAuth2Provider {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
}

impl GoogleOAuth2Provider {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id,
            client_secret,
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    pub fn from_config(config: &GoogleConfig) -> Self {
        Self::new(config.client_id.clone(), config.client_secret.clone())
            .with_token_url(&config.token_url)
    }

    pub fn with_token_url(mut self, token_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Exchange authorization code (plus PKCE verifier) for tokens.
    #[tracing::instrument(skip(self, code, code_verifier), level = "info")]
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<GoogleTokenResponse> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("code_verifier", code_verifier),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .context("Failed to send token request")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Token exchange failed: {}", error_text);
        }

        response.json::<GoogleTokenResponse>().await.context("Failed to parse token response")
    }

    /// Refresh an expired access token.
    #[tracing::instrument(skip(self, refresh_token), level = "info")]
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<GoogleTokenResponse> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .context("Failed to send refresh request")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Token refresh failed: {}", error_text);
        }

        response.json::<GoogleTokenResponse>().await.context("Failed to parse refresh response")
    }
}
