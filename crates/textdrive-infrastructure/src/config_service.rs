//! Application configuration.
//!
//! Loaded from `config.toml` in the config directory. Missing fields take
//! the defaults below; a few values can be overridden from the environment.

use serde::{Deserialize, Serialize};
use textdrive_core::Result;
use textdrive_core::auth::AuthConfig;

use crate::paths::TextDrivePaths;
use crate::storage::AtomicTomlFile;

pub const ENV_CLIENT_ID: &str = "TEXTDRIVE_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "TEXTDRIVE_CLIENT_SECRET";
pub const ENV_API_BASE_URL: &str = "TEXTDRIVE_API_BASE_URL";

const DEFAULT_CLIENT_ID: &str = "511145861127.apps.googleusercontent.com";
const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const DEFAULT_AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const DEFAULT_REDIRECT_URI: &str = "http://localhost";
const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub scopes: Vec<String>,
    pub auth_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub redirect_uri: String,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_secret: None,
            scopes: vec![DEFAULT_SCOPE.to_string()],
            auth_endpoint: DEFAULT_AUTH_ENDPOINT.to_string(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            userinfo_endpoint: DEFAULT_USERINFO_ENDPOINT.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub auth: AuthSection,
    pub api: ApiSection,
}

impl AppConfig {
    /// OAuth client configuration with `user_id` as the login hint.
    pub fn auth_config(&self, user_id: Option<String>) -> AuthConfig {
        AuthConfig::new(
            self.auth.client_id.clone(),
            self.auth.scopes.iter().cloned(),
            user_id,
        )
    }

    /// Applies environment overrides. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(client_id) = lookup(ENV_CLIENT_ID) {
            self.auth.client_id = client_id;
        }
        if let Some(secret) = lookup(ENV_CLIENT_SECRET) {
            self.auth.client_secret = Some(secret);
        }
        if let Some(base_url) = lookup(ENV_API_BASE_URL) {
            self.api.base_url = base_url;
        }
    }
}

/// Loads [`AppConfig`] from disk.
pub struct ConfigService {
    file: AtomicTomlFile<AppConfig>,
}

impl ConfigService {
    pub fn new(paths: &TextDrivePaths) -> Self {
        Self {
            file: AtomicTomlFile::new(paths.config_file()),
        }
    }

    /// Loads the file (defaults when absent) and applies process environment
    /// overrides.
    pub fn load(&self) -> Result<AppConfig> {
        let mut config = self.load_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_file(&self) -> Result<AppConfig> {
        match self.file.load()? {
            Some(config) => {
                tracing::debug!("[Config] loaded {}", self.file.path().display());
                Ok(config)
            }
            None => {
                tracing::debug!(
                    "[Config] {} not found, using defaults",
                    self.file.path().display()
                );
                Ok(AppConfig::default())
            }
        }
    }

    /// Writes `config` out, e.g. to create a template for the user to edit.
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        Ok(self.file.save(config)?)
    }
}
