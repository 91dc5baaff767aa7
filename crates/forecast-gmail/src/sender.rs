use anyhow::Result;
use forecast_auth::TokenSet;
use tracing::instrument;

use crate::client::GmailClient;
use crate::compose::ComposedMessage;

/// Hands a composed message to Gmail for delivery.
pub struct EmailSender {
    base_url: String,
}

impl EmailSender {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }

    /// Send `message` as the owner of `token`.
    ///
    /// `Ok(false)` means Gmail answered and refused; the reason is logged.
    /// Errors are reserved for requests that never got an answer.
    #[instrument(skip_all, level = "info")]
    pub async fn send(&self, message: &ComposedMessage, token: &TokenSet) -> Result<bool> {
        let client = GmailClient::new_with_base_url(&token.access_token, &self.base_url);

        match client.send_raw(message.envelope()).await {
            Ok(sent) => {
                tracing::info!("Gmail accepted message {}", sent.id);
                Ok(true)
            }
            Err(e) if e.is_provider_rejection() => {
                tracing::warn!("{} ({})", e.user_message(), e);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
