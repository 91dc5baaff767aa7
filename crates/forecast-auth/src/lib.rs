//! Gmail credential lifecycle: cached token, refresh, interactive authorization.

pub mod credentials;
pub mod google;
pub mod oauth;
pub mod storage;

pub use credentials::CredentialManager;
pub use google::{GoogleOAuth2Provider, GoogleTokenResponse};
pub use oauth::{Authorizer, BrowserAuthorizer};
pub use storage::{TokenSet, TokenStore};
