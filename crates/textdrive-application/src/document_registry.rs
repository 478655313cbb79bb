//! Open documents (tabs) and their save-state machines.
//!
//! The registry is owned by a single caller. Each operation runs to
//! completion, remote round trips included, before the next one starts.

use std::sync::Arc;

use textdrive_core::document::{Document, DocumentSummary, LocalId, SaveState};
use textdrive_core::remote::{DEFAULT_MIME_TYPE, RemoteFile, UploadContent};
use textdrive_core::session::PersistedFileIndex;
use textdrive_core::settings::{FALLBACK_TAB_SIZE, SettingKey, SettingValue, SettingsService};
use textdrive_core::ui::{
    self, BUTTON_CANCEL, BUTTON_NO, BUTTON_YES, BufferHandle, DialogButton, DialogService,
    EditorSurface, FilePicker,
};
use textdrive_core::{AppEvent, EventBus, Result, TextDriveError};

use crate::remote_file_client::RemoteFileClient;

pub const CLOSE_PROMPT: &str = "Do you want to save the file before closing?";
pub const NAME_PROMPT: &str = "Name this file before saving";
pub const SAVE_AS_PROMPT: &str = "Save file as";
pub const PICKER_TITLE: &str = "Open a text file";

/// External collaborators of the registry.
#[derive(Clone)]
pub struct Collaborators {
    pub editor: Arc<dyn EditorSurface>,
    pub dialog: Arc<dyn DialogService>,
    pub picker: Arc<dyn FilePicker>,
    pub settings: Arc<dyn SettingsService>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// A copy was inserted and opened as this document.
    SavedAs(LocalId),
    /// The user cancelled the title prompt.
    Cancelled,
    /// The remote call failed; an error event was published.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    Cancelled,
    /// Saving before close failed; the document stays open.
    SaveFailed,
}

pub struct DocumentRegistry {
    documents: Vec<Document>,
    current: Option<LocalId>,
    next_local_id: u64,
    index: PersistedFileIndex,
    client: Arc<RemoteFileClient>,
    collaborators: Collaborators,
    events: EventBus,
}

impl DocumentRegistry {
    pub fn new(
        index: PersistedFileIndex,
        client: Arc<RemoteFileClient>,
        collaborators: Collaborators,
        events: EventBus,
    ) -> Self {
        Self {
            documents: Vec::new(),
            current: None,
            next_local_id: 0,
            index,
            client,
            collaborators,
            events,
        }
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    /// Open documents in creation order.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document(&self, local_id: LocalId) -> Option<&Document> {
        self.documents.iter().find(|d| d.local_id == local_id)
    }

    pub fn current(&self) -> Option<&Document> {
        self.current.and_then(|id| self.document(id))
    }

    pub fn index(&self) -> &PersistedFileIndex {
        &self.index
    }

    /// Stores the user id in the session string.
    pub async fn remember_user_id(&mut self, user_id: &str) {
        self.index.set_user_id(user_id).await;
    }

    pub fn text_of(&self, local_id: LocalId) -> Option<String> {
        self.document(local_id)
            .map(|d| self.collaborators.editor.buffer_text(d.buffer))
    }

    fn position(&self, local_id: LocalId) -> Option<usize> {
        self.documents.iter().position(|d| d.local_id == local_id)
    }

    fn document_mut(&mut self, local_id: LocalId) -> Option<&mut Document> {
        self.documents.iter_mut().find(|d| d.local_id == local_id)
    }

    fn require(&self, local_id: LocalId) -> Result<&Document> {
        self.document(local_id)
            .ok_or_else(|| TextDriveError::not_found("document", local_id.to_string()))
    }

    fn resolve(&self, local_id: Option<LocalId>) -> Result<LocalId> {
        local_id
            .or(self.current)
            .ok_or_else(|| TextDriveError::consistency("no current document"))
    }

    fn summary(&self, local_id: LocalId) -> Option<DocumentSummary> {
        self.document(local_id).map(Document::summary)
    }

    // ============================================================================
    // Tabs
    // ============================================================================

    /// Opens a new document, optionally bound to a remote file.
    ///
    /// A bound document enters the index right away. Without `remote_file`
    /// its metadata and content are fetched before this returns.
    pub async fn new_tab(
        &mut self,
        remote_id: Option<String>,
        remote_file: Option<RemoteFile>,
    ) -> LocalId {
        let remote_id = remote_id
            .or_else(|| remote_file.as_ref().map(|f| f.id.clone()))
            .filter(|id| !id.is_empty());

        let editor = Arc::clone(&self.collaborators.editor);
        let buffer = editor.create_buffer();
        let local_id = LocalId(self.next_local_id);
        self.next_local_id += 1;

        editor.set_tab_width(buffer, self.tab_width());
        if let Some(wrap) = self.setting_bool(SettingKey::WrapLines) {
            editor.set_wrap_mode(buffer, wrap);
        }

        let mut document = Document::new(local_id, buffer);
        document.remote_id = remote_id.clone();
        let summary = document.summary();
        self.documents.push(document);
        tracing::debug!("[Registry] new document {} ({})", local_id, summary.name);
        self.events.publish(AppEvent::NewTab(summary));
        // The document was just pushed, showing it cannot fail.
        let _ = self.show_tab(local_id);

        if let Some(id) = remote_id {
            self.index.add(&id).await;
            let file = match remote_file {
                Some(file) => Some(file),
                None => self.client.get(&id, true).await,
            };
            if let Some(file) = file {
                if let Err(e) = self.set_file(local_id, file, true).await {
                    tracing::error!("[Registry] failed to bind document {}: {}", local_id, e);
                }
            }
        }
        local_id
    }

    pub fn show_tab(&mut self, local_id: LocalId) -> Result<()> {
        let document = self.require(local_id)?;
        let (buffer, summary) = (document.buffer, document.summary());

        let editor = &self.collaborators.editor;
        editor.activate_buffer(buffer);
        self.current = Some(local_id);
        self.events.publish(AppEvent::SwitchTab(summary));
        editor.focus();
        Ok(())
    }

    /// Shows the document after the current one, wrapping around.
    pub fn next_tab(&mut self) {
        let Some(position) = self.current.and_then(|id| self.position(id)) else {
            return;
        };
        let next = (position + 1) % self.documents.len();
        if next != position {
            let local_id = self.documents[next].local_id;
            let _ = self.show_tab(local_id);
        }
    }

    /// Opens the document bound to `remote_id`, or shows it when already open.
    pub async fn open_file_id(&mut self, remote_id: &str) -> Option<LocalId> {
        if remote_id.is_empty() {
            return None;
        }
        let existing = self
            .documents
            .iter()
            .find(|d| d.remote_id.as_deref() == Some(remote_id))
            .map(|d| d.local_id);
        if let Some(local_id) = existing {
            let _ = self.show_tab(local_id);
            return Some(local_id);
        }
        Some(self.new_tab(Some(remote_id.to_string()), None).await)
    }

    /// Lets the user pick plain text files and opens each of them.
    pub async fn open_file(&mut self) -> Vec<LocalId> {
        let picker = Arc::clone(&self.collaborators.picker);
        let ids = picker.pick(PICKER_TITLE, &[DEFAULT_MIME_TYPE]).await;
        let mut opened = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(local_id) = self.open_file_id(&id).await {
                opened.push(local_id);
            }
        }
        opened
    }

    /// Opens one document per indexed id, or one fresh document when the
    /// index is empty.
    pub async fn restore_session(&mut self) -> Vec<LocalId> {
        let ids = self.index.ids().to_vec();
        tracing::info!("[Registry] restoring {} document(s)", ids.len());
        if ids.is_empty() {
            return vec![self.new_tab(None, None).await];
        }
        let mut opened = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(local_id) = self.open_file_id(&id).await {
                opened.push(local_id);
            }
        }
        opened
    }

    // ============================================================================
    // Binding and state
    // ============================================================================

    /// Binds `local_id` to `file`. With `load_content` the file's content
    /// replaces the buffer and the document becomes Saved.
    async fn set_file(&mut self, local_id: LocalId, file: RemoteFile, load_content: bool) -> Result<()> {
        let new_id = file.id.clone();
        if new_id.is_empty() {
            return Err(TextDriveError::consistency(format!(
                "remote file for document {local_id} has no id"
            )));
        }
        let content = if load_content { file.content.clone() } else { None };

        let document = self
            .document_mut(local_id)
            .ok_or_else(|| TextDriveError::not_found("document", local_id.to_string()))?;
        let old_name = document.name();
        let replaced = document.bind(file);
        let renamed = document.name() != old_name;
        let (buffer, summary) = (document.buffer, document.summary());

        if let Some(old_id) = replaced {
            self.unindex_if_unbound(&old_id).await;
        }
        self.index.add(&new_id).await;

        if renamed {
            self.events.publish(AppEvent::TabRenamed(summary));
        }
        if let Some(content) = content {
            self.collaborators.editor.set_buffer_text(buffer, &content);
            self.set_state(local_id, SaveState::Saved);
        }
        Ok(())
    }

    /// Removes `remote_id` from the index unless another document is bound to it.
    async fn unindex_if_unbound(&mut self, remote_id: &str) {
        let still_bound = self
            .documents
            .iter()
            .any(|d| d.remote_id.as_deref() == Some(remote_id));
        if !still_bound {
            self.index.remove(remote_id).await;
        }
    }

    fn set_state(&mut self, local_id: LocalId, state: SaveState) {
        let Some(document) = self.document_mut(local_id) else {
            return;
        };
        if document.save_state == state {
            return;
        }
        document.save_state = state;
        let summary = document.summary();
        self.events.publish(AppEvent::TabChange(summary));
    }

    /// Handles a user edit reported by the editing surface.
    pub fn on_doc_changed(&mut self, buffer: BufferHandle) -> Result<()> {
        let current = self.current().filter(|d| d.buffer == buffer).map(|d| d.local_id);
        let local_id = match current {
            Some(local_id) => local_id,
            None => {
                tracing::warn!("[Registry] change reported for inactive {}", buffer);
                self.documents
                    .iter()
                    .find(|d| d.buffer == buffer)
                    .map(|d| d.local_id)
                    .ok_or_else(|| {
                        TextDriveError::consistency(format!("no document owns {buffer}"))
                    })?
            }
        };
        self.set_state(local_id, SaveState::Unsaved);
        Ok(())
    }

    // ============================================================================
    // Save
    // ============================================================================

    /// Saves a document (the current one by default).
    ///
    /// A bound document is updated in place. An unbound one is named through
    /// a prompt, inserted as plain text, and bound to the new file. Because
    /// the registry is borrowed mutably for the whole call, a second save of
    /// the same document cannot start while one is in flight.
    pub async fn save(&mut self, local_id: Option<LocalId>) -> Result<SaveOutcome> {
        let local_id = self.resolve(local_id)?;
        let document = self.require(local_id)?;
        if document.is_bound() && document.remote_file.is_none() {
            return Err(TextDriveError::consistency(format!(
                "document {local_id} is still loading"
            )));
        }
        let buffer = document.buffer;
        let bound_file = document.remote_file.clone().filter(|_| document.is_bound());

        let title = match &bound_file {
            Some(_) => None,
            None => match self.prompt_title(NAME_PROMPT).await {
                Some(title) => Some(title),
                None => return Ok(SaveOutcome::Cancelled),
            },
        };

        self.set_state(local_id, SaveState::Saving);
        let text = self.collaborators.editor.buffer_text(buffer);
        let content = UploadContent::plain(text);

        let saved = match (&bound_file, title) {
            (Some(file), _) => self.client.update(file, Some(&content)).await,
            (None, Some(title)) => {
                self.client
                    .insert(&title, DEFAULT_MIME_TYPE, Some(&content), None)
                    .await
            }
            (None, None) => None,
        };

        let Some(file) = saved else {
            self.set_state(local_id, SaveState::Unsaved);
            return Ok(SaveOutcome::Failed);
        };
        if let Some(bound) = &bound_file {
            if bound.id != file.id {
                tracing::warn!(
                    "[Registry] update of {} answered with id {}",
                    bound.id,
                    file.id
                );
            }
        }

        self.set_file(local_id, file, false).await?;
        self.set_state(local_id, SaveState::Saved);
        tracing::info!("[Registry] saved document {}", local_id);
        Ok(SaveOutcome::Saved)
    }

    /// Saves a bound document as a new remote copy opened in its own
    /// document. The original stays untouched. Unbound documents are saved
    /// normally.
    pub async fn save_as(&mut self, local_id: Option<LocalId>) -> Result<SaveOutcome> {
        let local_id = self.resolve(local_id)?;
        let document = self.require(local_id)?;
        if !document.is_bound() {
            return self.save(Some(local_id)).await;
        }
        let buffer = document.buffer;
        let mime_type = document
            .remote_file
            .as_ref()
            .map(|f| f.mime_type.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

        let Some(title) = self.prompt_title(SAVE_AS_PROMPT).await else {
            return Ok(SaveOutcome::Cancelled);
        };

        let contents = self.collaborators.editor.buffer_text(buffer);
        let content = UploadContent::plain(contents.clone());
        let Some(file) = self
            .client
            .insert(&title, &mime_type, Some(&content), None)
            .await
        else {
            return Ok(SaveOutcome::Failed);
        };

        let copy_id = file.id.clone();
        let copy = self
            .new_tab(Some(copy_id), Some(file.with_content(contents)))
            .await;
        Ok(SaveOutcome::SavedAs(copy))
    }

    async fn prompt_title(&self, message: &str) -> Option<String> {
        self.collaborators
            .dialog
            .prompt(message)
            .await
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Saves every unsaved bound document. Returns how many were saved.
    pub async fn save_all_pending(&mut self) -> usize {
        let pending: Vec<LocalId> = self
            .documents
            .iter()
            .filter(|d| d.save_state == SaveState::Unsaved && d.remote_file.is_some())
            .map(|d| d.local_id)
            .collect();

        let mut saved = 0;
        for local_id in pending {
            match self.save(Some(local_id)).await {
                Ok(SaveOutcome::Saved) => saved += 1,
                Ok(outcome) => {
                    tracing::warn!("[Registry] pending save of {}: {:?}", local_id, outcome)
                }
                Err(e) => tracing::error!("[Registry] pending save of {}: {}", local_id, e),
            }
        }
        saved
    }

    // ============================================================================
    // Close
    // ============================================================================

    /// Closes a document, resolving unsaved changes first.
    ///
    /// With autosave on, a bound document whose metadata arrived is saved and
    /// then closed. Otherwise the user chooses between saving, discarding and
    /// cancelling.
    pub async fn close(&mut self, local_id: LocalId) -> Result<CloseOutcome> {
        let document = self.require(local_id)?;
        if document.save_state == SaveState::Saved {
            self.close_now(local_id).await;
            return Ok(CloseOutcome::Closed);
        }

        let autosave = self.setting_bool(SettingKey::Autosave).unwrap_or(false);
        if autosave && document.is_bound() && document.remote_file.is_some() {
            return self.save_then_close(local_id).await;
        }

        let dialog = Arc::clone(&self.collaborators.dialog);
        let answer = ui::ask(
            dialog.as_ref(),
            CLOSE_PROMPT,
            vec![
                DialogButton::new(BUTTON_YES, "Yes"),
                DialogButton::new(BUTTON_NO, "No"),
                DialogButton::new(BUTTON_CANCEL, "Cancel"),
            ],
        )
        .await;

        match answer.as_deref() {
            Some(BUTTON_YES) => self.save_then_close(local_id).await,
            Some(BUTTON_NO) => {
                self.close_now(local_id).await;
                Ok(CloseOutcome::Closed)
            }
            _ => Ok(CloseOutcome::Cancelled),
        }
    }

    pub async fn close_current(&mut self) -> Result<CloseOutcome> {
        let local_id = self.resolve(None)?;
        self.close(local_id).await
    }

    async fn save_then_close(&mut self, local_id: LocalId) -> Result<CloseOutcome> {
        let saved = match self.save(Some(local_id)).await {
            Err(e) if e.is_consistency() => {
                tracing::warn!("[Registry] document {} not saved before close: {}", local_id, e);
                return Ok(CloseOutcome::SaveFailed);
            }
            saved => saved?,
        };
        match saved {
            SaveOutcome::Saved => {
                self.close_now(local_id).await;
                Ok(CloseOutcome::Closed)
            }
            SaveOutcome::Cancelled => Ok(CloseOutcome::Cancelled),
            _ => Ok(CloseOutcome::SaveFailed),
        }
    }

    /// Removes the document without checking its save state. Closing the
    /// last document opens a fresh empty one.
    async fn close_now(&mut self, local_id: LocalId) {
        if self.current == Some(local_id) {
            if self.documents.len() > 1 {
                self.next_tab();
            } else {
                self.current = None;
            }
        }

        let Some(position) = self.position(local_id) else {
            return;
        };
        let document = self.documents.remove(position);
        if let Some(remote_id) = document.remote_id.as_deref() {
            self.unindex_if_unbound(remote_id).await;
        }
        tracing::debug!("[Registry] closed document {}", local_id);
        self.events.publish(AppEvent::TabClosed(document.summary()));

        if self.documents.is_empty() {
            self.new_tab(None, None).await;
        }
    }

    // ============================================================================
    // Settings
    // ============================================================================

    /// Applies a settings change to every open buffer.
    pub fn on_settings_changed(&mut self, key: SettingKey, value: SettingValue) {
        match key {
            SettingKey::TabSize => {
                let Some(requested) = value.as_integer() else {
                    return;
                };
                let width = if requested <= 0 {
                    tracing::warn!("[Registry] tab size {} rejected, using {}", requested, FALLBACK_TAB_SIZE);
                    if let Err(e) = self
                        .collaborators
                        .settings
                        .set(SettingKey::TabSize, SettingValue::Integer(FALLBACK_TAB_SIZE))
                    {
                        tracing::warn!("[Registry] failed to store fallback tab size: {}", e);
                    }
                    FALLBACK_TAB_SIZE
                } else {
                    requested
                };
                let width = to_width(width);
                for document in &self.documents {
                    self.collaborators.editor.set_tab_width(document.buffer, width);
                }
            }
            SettingKey::WrapLines => {
                let Some(wrap) = value.as_bool() else {
                    return;
                };
                for document in &self.documents {
                    self.collaborators.editor.set_wrap_mode(document.buffer, wrap);
                }
            }
            _ => {}
        }
    }

    fn tab_width(&self) -> u32 {
        let size = self
            .collaborators
            .settings
            .get(SettingKey::TabSize)
            .as_integer()
            .filter(|size| *size > 0)
            .unwrap_or(FALLBACK_TAB_SIZE);
        to_width(size)
    }

    fn setting_bool(&self, key: SettingKey) -> Option<bool> {
        self.collaborators.settings.get(key).as_bool()
    }
}

fn to_width(size: i64) -> u32 {
    u32::try_from(size).unwrap_or(FALLBACK_TAB_SIZE as u32)
}
