use anyhow::{Context, Result};
use forecast_core::GoogleConfig;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl,
    Scope, TokenUrl,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use warp::Filter;

use crate::google::GoogleOAuth2Provider;
use crate::storage::TokenSet;

/// Permission to send mail as the user, nothing else
pub const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";

const CALLBACK_PAGE: &str = "<html><body><h1>Authorization successful!</h1>\
    <p>You can close this window. The forecast email is on its way.</p></body></html>";

/// Obtains a brand-new credential from the user.
///
/// The credential manager falls back to this when there is no usable cached
/// token. Tests swap in a fake that hands back a canned token.
pub trait Authorizer {
    async fn authorize(&self) -> Result<TokenSet>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization denied: {0}")]
    Denied(String),

    #[error("OAuth callback did not include an authorization code")]
    MissingCode,

    #[error("CSRF token mismatch")]
    CsrfMismatch,
}

/// Query parameters Google appends to the redirect URI
#[derive(Debug, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    fn from_query(params: &HashMap<String, String>) -> Self {
        Self {
            code: params.get("code").cloned(),
            state: params.get("state").cloned(),
            error: params.get("error").cloned(),
        }
    }

    /// Validate the callback against the state we sent and return the code.
    pub fn into_code(self, expected_state: &str) -> Result<String, AuthError> {
        if let Some(error) = self.error {
            return Err(AuthError::Denied(error));
        }
        if self.state.as_deref() != Some(expected_state) {
            return Err(AuthError::CsrfMismatch);
        }
        self.code.filter(|c| !c.is_empty()).ok_or(AuthError::MissingCode)
    }
}

/// Installed-app flow: consent in the browser, code delivered to a local listener.
pub struct BrowserAuthorizer {
    provider: GoogleOAuth2Provider,
    auth_url: String,
    port: u16,
    scopes: Vec<String>,
}

impl BrowserAuthorizer {
    pub fn new(config: &GoogleConfig, provider: GoogleOAuth2Provider) -> Self {
        Self {
            provider,
            auth_url: config.auth_url.clone(),
            port: config.redirect_port,
            scopes: vec![GMAIL_SEND_SCOPE.to_string()],
        }
    }

    fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.port)
    }

    /// Build the consent URL with PKCE and a random CSRF state.
    ///
    /// Offline access with forced consent so Google always issues a refresh token.
    pub fn authorization_url(&self) -> Result<(String, CsrfToken, PkceCodeVerifier)> {
        let client = BasicClient::new(
            ClientId::new(self.provider.client_id().to_string()),
            Some(ClientSecret::new(self.provider.client_secret().to_string())),
            AuthUrl::new(self.auth_url.clone()).context("Invalid auth URL")?,
            Some(TokenUrl::new(self.provider.token_url().to_string()).context("Invalid token URL")?),
        )
        .set_redirect_uri(RedirectUrl::new(self.redirect_uri()).context("Invalid redirect URI")?);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = client.authorize_url(CsrfToken::new_random);
        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = auth_request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        Ok((auth_url.to_string(), csrf_token, pkce_verifier))
    }

    /// Serve `/callback` on localhost until Google redirects back once.
    async fn wait_for_callback(&self, auth_url: &str) -> Result<CallbackParams> {
        let (tx, rx) = oneshot::channel::<CallbackParams>();
        let tx = Arc::new(Mutex::new(Some(tx)));

        let routes = warp::get()
            .and(warp::path("callback"))
            .and(warp::path::end())
            .and(warp::query::<HashMap<String, String>>())
            .and(warp::any().map(move || tx.clone()))
            .and_then(
                |params: HashMap<String, String>,
                 tx: Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>| async move {
                    if let Some(sender) = tx.lock().await.take() {
                        let _ = sender.send(CallbackParams::from_query(&params));
                    }
                    Ok::<_, warp::Rejection>(warp::reply::html(CALLBACK_PAGE))
                },
            );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (addr, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(([127, 0, 0, 1], self.port), async move {
                let _ = shutdown_rx.await;
            })
            .with_context(|| format!("Failed to listen for OAuth callback on port {}", self.port))?;
        let server = tokio::spawn(server);
        tracing::info!("Waiting for OAuth callback on {}", addr);

        if let Err(e) = webbrowser::open(auth_url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
        eprintln!("Authorize Gmail access by visiting:\n\n    {}\n", auth_url);

        let params = rx.await.context("Failed to receive OAuth callback");

        let _ = shutdown_tx.send(());
        if let Err(e) = server.await {
            tracing::warn!("OAuth callback server did not shut down cleanly: {}", e);
        }

        params
    }
}

impl Authorizer for BrowserAuthorizer {
    async fn authorize(&self) -> Result<TokenSet> {
        let (auth_url, csrf_token, pkce_verifier) = self.authorization_url()?;

        tracing::info!("Starting OAuth2 authorization in browser");
        let params = self.wait_for_callback(&auth_url).await?;
        let code = params.into_code(csrf_token.secret())?;

        let response = self
            .provider
            .exchange_code(&code, &self.redirect_uri(), pkce_verifier.secret())
            .await?;

        tracing::info!("OAuth2 authorization completed");
        Ok(response.into_token_set(None))
    }
}
