//! File-backed session string.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use textdrive_core::Result;
use textdrive_core::session::SessionStore;

use crate::paths::TextDrivePaths;
use crate::storage::AtomicTomlFile;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionRecord {
    query: String,
    saved_at: DateTime<Utc>,
}

/// Stores the session restoration string in `session.toml`.
pub struct FileSessionStore {
    file: AtomicTomlFile<SessionRecord>,
}

impl FileSessionStore {
    pub fn new(paths: &TextDrivePaths) -> Self {
        Self {
            file: AtomicTomlFile::new(paths.session_file()),
        }
    }

    /// When the session was last written, if ever.
    pub fn saved_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.file.load()?.map(|record| record.saved_at))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<String> {
        Ok(self
            .file
            .load()?
            .map(|record| record.query)
            .unwrap_or_default())
    }

    async fn save(&self, query: &str) -> Result<()> {
        let record = SessionRecord {
            query: query.to_string(),
            saved_at: Utc::now(),
        };
        self.file.save(&record)?;
        tracing::trace!("[Index] session saved: {}", query);
        Ok(())
    }
}
