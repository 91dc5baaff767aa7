use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::error::ConfigError;

const APP_DIR: &str = "forecast-mailer";
const ENV_PREFIX: &str = "FORECAST";
const CONFIG_PATH_VAR: &str = "FORECAST_CONFIG";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Process-wide settings, built once at startup and passed by reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub mail: MailConfig,

    #[serde(default)]
    pub google: GoogleConfig,
}

/// Weather provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// WeatherAPI.com key
    pub api_key: String,

    /// Location passed as `q` (zip/postal code, city name, ...)
    pub location: String,

    pub base_url: String,

    /// Request timeout in seconds (0 disables the timeout)
    pub timeout_seconds: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            location: String::new(),
            base_url: "https://api.weatherapi.com".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Email composition and delivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub sender: String,
    pub recipient: String,

    /// HTML template rendered into the message body
    pub template_path: PathBuf,

    /// Root of the icon library (`<icon_dir>/64x64/day/<file>`)
    pub icon_dir: PathBuf,

    pub gmail_base_url: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender: String::new(),
            recipient: String::new(),
            template_path: PathBuf::from("templates/forecast.html"),
            icon_dir: PathBuf::from("assets/icons"),
            gmail_base_url: "https://gmail.googleapis.com".to_string(),
        }
    }
}

/// Google OAuth client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,

    /// Local port for the OAuth redirect listener
    pub redirect_port: u16,

    /// Where the credential is cached between runs
    pub token_path: PathBuf,
}

impl GoogleConfig {
    /// Check if credentials are configured (not placeholders)
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty()
            && !self.client_secret.is_empty()
            && !self.client_id.starts_with("YOUR_")
            && !self.client_secret.starts_with("YOUR_")
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            redirect_port: 8080,
            token_path: app_dir().join("token.json"),
        }
    }
}

fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

impl Config {
    /// Load configuration from `.env`, the config file and `FORECAST_*` variables.
    ///
    /// Later sources win: environment variables override the file.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }

        let path = std::env::var_os(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(Self::config_path);

        Self::build(
            config::Config::builder().add_source(
                config::File::from(path)
                    .required(false)
                    .format(config::FileFormat::Toml),
            ),
            Self::environment(),
        )
    }

    /// Load configuration and fail on validation errors, logging warnings.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Parse a TOML document layered under the given environment source.
    pub fn from_toml_str(contents: &str, env: config::Environment) -> Result<Self> {
        Self::build(
            config::Config::builder()
                .add_source(config::File::from_str(contents, config::FileFormat::Toml)),
            env,
        )
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        env: config::Environment,
    ) -> Result<Self> {
        let settings = builder
            .add_source(env)
            .build()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to deserialize configuration")?;

        Ok(config)
    }

    /// `FORECAST_WEATHER__API_KEY` -> `weather.api_key`
    pub fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        require(&self.weather.api_key, "weather.api_key", &mut result);
        require(&self.weather.location, "weather.location", &mut result);
        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        if self.weather.timeout_seconds == 0 {
            result.add_warning("weather.timeout_seconds", "Weather request timeout disabled");
        }

        validate_address(&self.mail.sender, "mail.sender", &mut result);
        validate_address(&self.mail.recipient, "mail.recipient", &mut result);
        self.validate_url(&self.mail.gmail_base_url, "mail.gmail_base_url", &mut result);

        if !self.mail.template_path.is_file() {
            result.add_warning(
                "mail.template_path",
                format!("Template not found: {}", self.mail.template_path.display()),
            );
        }
        if !self.mail.icon_dir.is_dir() {
            result.add_warning(
                "mail.icon_dir",
                format!("Icon directory not found: {}", self.mail.icon_dir.display()),
            );
        }

        if !self.google.is_configured() {
            result.add_error("google", "Google OAuth client_id/client_secret not configured");
        }
        self.validate_url(&self.google.auth_url, "google.auth_url", &mut result);
        self.validate_url(&self.google.token_url, "google.token_url", &mut result);

        if self.google.redirect_port == 0 {
            result.add_error("google.redirect_port", "Port cannot be 0");
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Default config file location, e.g. `~/.config/forecast-mailer/config.toml`
    pub fn config_path() -> PathBuf {
        app_dir().join("config.toml")
    }
}

fn require(value: &str, field: &str, result: &mut ValidationResult) {
    if value.trim().is_empty() {
        result.add_error(field, ConfigError::MissingSetting(field.to_string()).to_string());
    }
}

fn validate_address(value: &str, field: &str, result: &mut ValidationResult) {
    if value.trim().is_empty() {
        result.add_error(field, ConfigError::MissingSetting(field.to_string()).to_string());
        return;
    }

    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => result.add_error(field, format!("Not an email address: {}", value)),
    }
}
