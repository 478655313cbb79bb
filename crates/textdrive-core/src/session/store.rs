//! Session string storage.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;

/// Durable home of the session restoration string.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the stored session string. Empty when nothing was stored.
    async fn load(&self) -> Result<String>;

    async fn save(&self, query: &str) -> Result<()>;
}

/// Session store that lives only for the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    query: Mutex<String>,
}

impl MemorySessionStore {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            query: Mutex::new(initial.into()),
        }
    }

    pub async fn current(&self) -> String {
        self.query.lock().await.clone()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<String> {
        Ok(self.query.lock().await.clone())
    }

    async fn save(&self, query: &str) -> Result<()> {
        *self.query.lock().await = query.to_string();
        Ok(())
    }
}
