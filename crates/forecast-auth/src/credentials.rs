//! Credential lifecycle for the Gmail send scope.
//!
//! The cached token moves through three states on every run:
//!
//! - absent (no file, or one that no longer parses): run the interactive flow
//! - stale (inside the refresh window): refresh once if a refresh token exists,
//!   otherwise run the interactive flow
//! - valid: use as-is
//!
//! Anything newly obtained is written back before it is handed out.

use anyhow::{Context, Result};
use tracing::instrument;

use crate::google::GoogleOAuth2Provider;
use crate::oauth::Authorizer;
use crate::storage::{TokenSet, TokenStore};

pub struct CredentialManager<A> {
    store: TokenStore,
    provider: GoogleOAuth2Provider,
    authorizer: A,
}

impl<A: Authorizer> CredentialManager<A> {
    pub fn new(store: TokenStore, provider: GoogleOAuth2Provider, authorizer: A) -> Self {
        Self {
            store,
            provider,
            authorizer,
        }
    }

    /// Return a usable token set, refreshing or re-authorizing as needed.
    ///
    /// A failed refresh is an error. It does not fall through to the browser flow.
    #[instrument(skip(self), level = "info")]
    pub async fn obtain(&self) -> Result<TokenSet> {
        let cached = self.store.load()?;

        let token = match cached {
            Some(token) if !token.needs_refresh() => {
                tracing::debug!("Using cached token");
                return Ok(token);
            }
            Some(token) if token.can_refresh() => {
                tracing::info!(expired = token.is_expired(), "Cached token is stale, refreshing");
                let previous = token.refresh_token;
                let refresh = previous.as_deref().unwrap_or_default();
                self.provider
                    .refresh_token(refresh)
                    .await
                    .context("Failed to refresh Gmail credential")?
                    .into_token_set(previous)
            }
            Some(_) => {
                tracing::info!("Cached token is stale and cannot be refreshed, re-authorizing");
                self.authorizer.authorize().await?
            }
            None => {
                tracing::info!("No cached token, starting authorization");
                self.authorizer.authorize().await?
            }
        };

        self.store.save(&token)?;
        Ok(token)
    }
}
