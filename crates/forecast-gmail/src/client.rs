//! Gmail API client.

use tracing::instrument;

use crate::error::GmailError;
use crate::types::{SendEnvelope, SentMessage};

pub struct GmailClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GmailClient {
    /// `base_url` is normally `https://gmail.googleapis.com`.
    pub fn new_with_base_url(access_token: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Send a prebuilt RFC 822 message as the authenticated user.
    #[instrument(skip(self, envelope), level = "info")]
    pub async fn send_raw(&self, envelope: &SendEnvelope) -> Result<SentMessage, GmailError> {
        let url = format!("{}/gmail/v1/users/me/messages/send", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(envelope)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        // The send already happened; an odd body does not undo it.
        let text = response.text().await?;
        Ok(serde_json::from_str(&text).unwrap_or_default())
    }

    /// Map a non-2xx response to the matching error.
    async fn error_for(response: reqwest::Response) -> GmailError {
        let status = response.status();

        match status.as_u16() {
            401 => GmailError::TokenExpired,
            403 => GmailError::AuthRequired,
            429 => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60);
                GmailError::RateLimited(retry_after)
            }
            400 => GmailError::SendFailed(response.text().await.unwrap_or_default()),
            _ => {
                let text = response.text().await.unwrap_or_default();
                GmailError::ApiError(format!("{}: {}", status, text))
            }
        }
    }
}
