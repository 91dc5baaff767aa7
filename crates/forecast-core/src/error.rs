//! Error taxonomy for the forecast mailer.
//!
//! Crate-level errors (weather, gmail, auth) travel up as `anyhow::Error`.
//! `AppError::classify` maps the chain back onto a short user-facing message
//! for the final diagnostic printed by the binary.

use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Wrap a fatal error, lifting well-known causes out of the chain.
    pub fn classify(err: anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(config) = cause.downcast_ref::<ConfigError>() {
                return AppError::Config(config.clone());
            }
            if let Some(reqwest) = cause.downcast_ref::<reqwest::Error>() {
                return AppError::Network(NetworkError::from_reqwest(reqwest));
            }
            if let Some(io) = cause.downcast_ref::<std::io::Error>() {
                return AppError::Io(std::io::Error::new(io.kind(), io.to_string()));
            }
        }
        AppError::Other(err)
    }

    /// Returns a short, actionable message for the terminal.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                "A required local file is missing (template, icon or token store)."
            }
            AppError::Io(_) => "A file operation failed. Check file permissions.",
            AppError::Other(_) => "An unexpected error occurred.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },
}

impl NetworkError {
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            NetworkError::Timeout
        } else if let Some(status) = error.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(error.to_string())
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The provider is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "The provider rejected the request.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::MissingSetting(_) => "A required setting is missing. Check your settings.",
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_classify_config_error_through_context() {
        let err = Err::<(), _>(ConfigError::MissingSetting("weather.api_key".into()))
            .context("Failed to load configuration")
            .unwrap_err();

        let app_err = AppError::classify(err);
        assert!(matches!(app_err, AppError::Config(ConfigError::MissingSetting(_))));
        assert_eq!(
            app_err.user_message(),
            "A required setting is missing. Check your settings."
        );
    }

    #[test]
    fn test_classify_missing_file() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "113.png");
        let err = anyhow::Error::new(io).context("Failed to read icon");

        let app_err = AppError::classify(err);
        assert!(matches!(app_err, AppError::Io(_)));
        assert!(app_err.user_message().contains("missing"));
    }

    #[test]
    fn test_classify_unknown_is_other() {
        let app_err = AppError::classify(anyhow::anyhow!("something odd"));
        assert!(matches!(app_err, AppError::Other(_)));
        assert_eq!(app_err.to_string(), "something odd");
    }

    #[test]
    fn test_server_error_messages() {
        let err = NetworkError::ServerError { status: 503, message: "down".into() };
        assert!(err.user_message().contains("later"));

        let err = NetworkError::ServerError { status: 400, message: "bad".into() };
        assert!(err.user_message().contains("rejected"));
    }
}
