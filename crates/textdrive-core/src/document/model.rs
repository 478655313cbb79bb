//! Document (tab) domain models.

use std::fmt;

use crate::remote::RemoteFile;
use crate::ui::BufferHandle;

/// Name of a bound document whose metadata has not arrived yet.
pub const LOADING_NAME: &str = "Loading...";
/// Name prefix of a document with no remote identity.
pub const UNTITLED_PREFIX: &str = "Untitled";

/// Local document id. Strictly increasing and never reused in a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalId(pub u64);

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Saved,
    Saving,
    Unsaved,
}

impl SaveState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Saving => "saving",
            Self::Unsaved => "unsaved",
        }
    }
}

impl fmt::Display for SaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One open document.
///
/// `remote_id` is the bound remote identity; `remote_file` holds its
/// metadata once hydrated. A bound document may still lack `remote_file`
/// while its fetch is in flight.
#[derive(Debug, Clone)]
pub struct Document {
    pub local_id: LocalId,
    pub buffer: BufferHandle,
    pub remote_id: Option<String>,
    pub remote_file: Option<RemoteFile>,
    pub save_state: SaveState,
}

impl Document {
    pub fn new(local_id: LocalId, buffer: BufferHandle) -> Self {
        Self {
            local_id,
            buffer,
            remote_id: None,
            remote_file: None,
            save_state: SaveState::Saved,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.remote_id.is_some()
    }

    /// Display name: provider title, `Loading...` while hydrating, or
    /// `Untitled <localId>`.
    pub fn name(&self) -> String {
        match (&self.remote_file, &self.remote_id) {
            (Some(file), _) => file.title.clone(),
            (None, Some(_)) => LOADING_NAME.to_string(),
            (None, None) => format!("{UNTITLED_PREFIX} {}", self.local_id),
        }
    }

    pub fn extension(&self) -> Option<String> {
        self.remote_file.as_ref().and_then(RemoteFile::extension)
    }

    /// Binds the document to `file`, returning the previous remote id when it
    /// differs from the new one.
    pub fn bind(&mut self, file: RemoteFile) -> Option<String> {
        let previous = self.remote_id.replace(file.id.clone());
        self.remote_file = Some(file);
        previous.filter(|old| Some(old) != self.remote_id.as_ref())
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            local_id: self.local_id,
            name: self.name(),
            save_state: self.save_state,
            remote_id: self.remote_id.clone(),
        }
    }
}

/// Snapshot of a document carried by tab events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub local_id: LocalId,
    pub name: String,
    pub save_state: SaveState,
    pub remote_id: Option<String>,
}
