//! Gmail-specific error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GmailError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("Token expired")]
    TokenExpired,

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl GmailError {
    /// User-friendly error message for terminal output.
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthRequired => "Gmail refused the credential for sending mail".to_string(),
            Self::TokenExpired => "Your Gmail session has expired. Please sign in again.".to_string(),
            Self::RateLimited(secs) => format!("Too many requests. Please wait {} seconds.", secs),
            Self::SendFailed(msg) => format!("Failed to send email: {}", msg),
            Self::ApiError(msg) => format!("Gmail error: {}", msg),
            Self::NetworkError(_) => "Network error. Check your connection.".to_string(),
        }
    }

    /// Gmail answered, but not with success.
    ///
    /// Transport failures are not rejections; they never reached the provider.
    pub fn is_provider_rejection(&self) -> bool {
        !matches!(self, Self::NetworkError(_))
    }
}
