//! Cached OAuth credentials.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use textdrive_core::Result;

use crate::paths::TextDrivePaths;
use crate::storage::AtomicTomlFile;

/// Access tokens this close to expiry are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    /// Client the tokens were issued to.
    #[serde(default)]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl StoredCredentials {
    /// The access token when it is still valid at `now`.
    pub fn valid_access_token(&self, now: DateTime<Utc>) -> Option<&str> {
        let expires_at = self.expires_at?;
        if expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) <= now {
            return None;
        }
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Records a fresh access token. A missing refresh token keeps the old one.
    pub fn record_token(
        &mut self,
        access_token: String,
        expires_in_secs: i64,
        refresh_token: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.access_token = Some(access_token);
        self.expires_at = Some(now + Duration::seconds(expires_in_secs));
        if let Some(refresh_token) = refresh_token.filter(|t| !t.is_empty()) {
            self.refresh_token = Some(refresh_token);
        }
    }

    /// Drops the access token when it is `token`. The refresh token stays.
    pub fn forget_access_token(&mut self, token: &str) -> bool {
        if self.access_token.as_deref() != Some(token) {
            return false;
        }
        self.access_token = None;
        self.expires_at = None;
        true
    }
}

/// Credentials persisted to `credentials.toml` (owner-only on Unix).
pub struct CredentialStore {
    file: AtomicTomlFile<StoredCredentials>,
}

impl CredentialStore {
    pub fn new(paths: &TextDrivePaths) -> Self {
        Self {
            file: AtomicTomlFile::new(paths.credentials_file()).private(),
        }
    }

    /// Credentials for `client_id`. Tokens issued to another client are ignored.
    pub fn load(&self, client_id: &str) -> Result<StoredCredentials> {
        let stored = self.file.load()?.unwrap_or_default();
        if stored.client_id != client_id {
            return Ok(StoredCredentials {
                client_id: client_id.to_string(),
                ..Default::default()
            });
        }
        Ok(stored)
    }

    pub fn save(&self, credentials: &StoredCredentials) -> Result<()> {
        Ok(self.file.save(credentials)?)
    }

    /// Forgets every cached token.
    pub fn clear(&self) -> Result<()> {
        Ok(self.file.save(&StoredCredentials::default())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_token_validity_respects_margin() {
        let now = Utc::now();
        let mut creds = StoredCredentials::default();
        assert_eq!(creds.valid_access_token(now), None);

        creds.record_token("tok".to_string(), 3600, None, now);
        assert_eq!(creds.valid_access_token(now), Some("tok"));
        assert_eq!(
            creds.valid_access_token(now + Duration::seconds(3600 - 30)),
            None
        );
    }

    #[test]
    fn test_refresh_token_survives_refresh_without_one() {
        let now = Utc::now();
        let mut creds = StoredCredentials::default();
        creds.record_token("a".to_string(), 10, Some("r1".to_string()), now);
        creds.record_token("b".to_string(), 10, None, now);
        assert_eq!(creds.refresh_token.as_deref(), Some("r1"));
    }

    #[test]
    fn test_forget_access_token_keeps_refresh_token() {
        let now = Utc::now();
        let mut creds = StoredCredentials::default();
        creds.record_token("a".to_string(), 3600, Some("r1".to_string()), now);

        assert!(!creds.forget_access_token("other"));
        assert_eq!(creds.valid_access_token(now), Some("a"));

        assert!(creds.forget_access_token("a"));
        assert_eq!(creds.valid_access_token(now), None);
        assert_eq!(creds.refresh_token.as_deref(), Some("r1"));
    }

    #[test]
    fn test_other_client_credentials_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::new(&TextDrivePaths::with_root(temp_dir.path()));

        store
            .save(&StoredCredentials {
                client_id: "old".to_string(),
                refresh_token: Some("r".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(store.load("old").unwrap().refresh_token.as_deref(), Some("r"));
        let fresh = store.load("new").unwrap();
        assert_eq!(fresh.client_id, "new");
        assert_eq!(fresh.refresh_token, None);
    }
}
