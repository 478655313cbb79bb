//! Durable ordered set of open remote file ids.

use std::sync::Arc;

use crate::error::Result;
use crate::session::params::SessionParams;
use crate::session::store::SessionStore;

/// Ordered set of the remote ids bound to open documents, persisted as the
/// `f` field of the session string next to the user id.
///
/// Every mutation flushes to the store. A failed flush is logged and the
/// in-memory set stays authoritative for the rest of the process.
pub struct PersistedFileIndex {
    store: Arc<dyn SessionStore>,
    params: SessionParams,
}

impl PersistedFileIndex {
    /// Loads the index from `store`. An unreadable session starts empty.
    pub async fn load(store: Arc<dyn SessionStore>) -> Self {
        let params = match store.load().await {
            Ok(query) => SessionParams::parse(&query),
            Err(e) => {
                tracing::warn!("[Index] failed to load session, starting empty: {}", e);
                SessionParams::default()
            }
        };
        tracing::debug!(
            "[Index] loaded {} file id(s), user id known: {}",
            params.file_ids.len(),
            params.user_id.is_some()
        );
        Self { store, params }
    }

    pub fn ids(&self) -> &[String] {
        &self.params.file_ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.params.file_ids.iter().any(|known| known == id)
    }

    pub fn len(&self) -> usize {
        self.params.file_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.file_ids.is_empty()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.params.user_id.as_deref()
    }

    /// Current session string.
    pub fn query_string(&self) -> String {
        self.params.to_query_string()
    }

    /// Appends `id` unless present. Returns whether the set changed.
    pub async fn add(&mut self, id: &str) -> bool {
        if id.is_empty() || self.contains(id) {
            return false;
        }
        self.params.file_ids.push(id.to_string());
        self.flush_or_warn().await;
        true
    }

    /// Removes `id`. Returns whether the set changed.
    pub async fn remove(&mut self, id: &str) -> bool {
        let before = self.params.file_ids.len();
        self.params.file_ids.retain(|known| known != id);
        if self.params.file_ids.len() == before {
            return false;
        }
        self.flush_or_warn().await;
        true
    }

    /// Records the user id. Empty ids are ignored; a known id is only ever
    /// replaced by another non-empty one.
    pub async fn set_user_id(&mut self, user_id: &str) -> bool {
        if user_id.is_empty() || self.params.user_id.as_deref() == Some(user_id) {
            return false;
        }
        self.params.user_id = Some(user_id.to_string());
        self.flush_or_warn().await;
        true
    }

    pub async fn flush(&self) -> Result<()> {
        self.store.save(&self.params.to_query_string()).await
    }

    async fn flush_or_warn(&self) {
        if let Err(e) = self.flush().await {
            tracing::warn!("[Index] failed to persist session: {}", e);
        }
    }
}
