use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Seconds before expiry at which a token is treated as stale
const REFRESH_WINDOW_SECS: i64 = 300;

/// Token set for OAuth2 authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    /// Access token for API requests
    pub access_token: String,

    /// Optional refresh token for token renewal
    pub refresh_token: Option<String>,

    /// Token expiration timestamp (Unix timestamp)
    pub expires_at: i64,

    /// Scopes granted to this token
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl TokenSet {
    /// Check if the token needs refresh (within 5 minutes of expiry)
    pub fn needs_refresh(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at - REFRESH_WINDOW_SECS
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// File-backed credential cache.
///
/// Holds a single token set as JSON. Every save replaces the whole file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached token set.
    ///
    /// A missing file or one that no longer parses yields `None`; other I/O
    /// failures are errors.
    pub fn load(&self) -> Result<Option<TokenSet>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No cached token at {:?}", self.path);
                return Ok(None);
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read token file {}", self.path.display()))
            }
        };

        match serde_json::from_str::<TokenSet>(&json) {
            Ok(token_set) => {
                tracing::debug!("Retrieved cached token from {:?}", self.path);
                Ok(Some(token_set))
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable token file {:?}: {}", self.path, e);
                Ok(None)
            }
        }
    }

    /// Persist a token set, replacing any previous one.
    ///
    /// Writes a sibling temp file and renames it over the target.
    pub fn save(&self, token_set: &TokenSet) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create token directory")?;
        }

        let json =
            serde_json::to_string_pretty(token_set).context("Failed to serialize token set")?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json).context("Failed to write token file")?;
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &self.path).context("Failed to replace token file")?;

        tracing::info!("Stored token at {:?}", self.path);
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .context("Failed to restrict token file permissions")
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
