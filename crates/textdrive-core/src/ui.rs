//! Collaborator interfaces consumed by the sync layer.
//!
//! The editing widget, modal dialogs and the remote file picker live outside
//! this workspace. The registry and the application only talk to them through
//! these traits.

use async_trait::async_trait;

/// Opaque reference to an editable buffer owned by the editing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u64);

impl std::fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

/// The text editing surface.
///
/// Implementations publish [`crate::event::AppEvent::DocChange`] for user
/// edits only. Text written through [`EditorSurface::set_buffer_text`] is a
/// programmatic load and must not be reported as an edit.
pub trait EditorSurface: Send + Sync {
    fn create_buffer(&self) -> BufferHandle;

    /// Makes `buffer` the one shown in the editing surface.
    fn activate_buffer(&self, buffer: BufferHandle);

    fn focus(&self);

    fn buffer_text(&self, buffer: BufferHandle) -> String;

    fn set_buffer_text(&self, buffer: BufferHandle, text: &str);

    fn set_tab_width(&self, buffer: BufferHandle, width: u32);

    fn set_wrap_mode(&self, buffer: BufferHandle, wrap: bool);
}

/// One selectable answer of a dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogButton {
    pub id: String,
    pub label: String,
}

impl DialogButton {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

pub const BUTTON_YES: &str = "yes";
pub const BUTTON_NO: &str = "no";
pub const BUTTON_CANCEL: &str = "cancel";
pub const BUTTON_OK: &str = "ok";

/// Modal dialog service.
#[async_trait]
pub trait DialogService: Send + Sync {
    fn set_message(&self, message: &str);

    /// Replaces the buttons of the next dialog.
    fn set_buttons(&self, buttons: Vec<DialogButton>);

    /// Shows the dialog and resolves with the id of the chosen button, or
    /// `None` when it was dismissed without an answer.
    async fn show(&self) -> Option<String>;

    /// Blocking single-line text prompt. `None` means the user cancelled.
    async fn prompt(&self, message: &str) -> Option<String>;
}

/// Sets message and buttons, then shows the dialog.
pub async fn ask(
    dialog: &dyn DialogService,
    message: &str,
    buttons: Vec<DialogButton>,
) -> Option<String> {
    dialog.set_message(message);
    dialog.set_buttons(buttons);
    dialog.show().await
}

/// Remote file picker.
#[async_trait]
pub trait FilePicker: Send + Sync {
    /// Returns the identifiers the user picked, possibly none.
    async fn pick(&self, title: &str, mime_types: &[&str]) -> Vec<String>;
}
