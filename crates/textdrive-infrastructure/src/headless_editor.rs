//! In-memory editing surface.
//!
//! Stands in for a real text widget: it keeps buffer text and view options
//! and reports user edits on the event bus. Used by the CLI shell and by
//! tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use textdrive_core::ui::{BufferHandle, EditorSurface};
use textdrive_core::{AppEvent, EventBus};

const INITIAL_TAB_WIDTH: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferView {
    pub text: String,
    pub tab_width: u32,
    pub wrap: bool,
}

impl Default for BufferView {
    fn default() -> Self {
        Self {
            text: String::new(),
            tab_width: INITIAL_TAB_WIDTH,
            wrap: false,
        }
    }
}

#[derive(Debug, Default)]
struct EditorState {
    next_handle: u64,
    buffers: BTreeMap<BufferHandle, BufferView>,
    active: Option<BufferHandle>,
    focus_count: u64,
}

pub struct HeadlessEditor {
    state: Mutex<EditorState>,
    events: EventBus,
}

impl HeadlessEditor {
    pub fn new(events: EventBus) -> Self {
        Self {
            state: Mutex::new(EditorState::default()),
            events,
        }
    }

    fn state(&self) -> MutexGuard<'_, EditorState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn active_buffer(&self) -> Option<BufferHandle> {
        self.state().active
    }

    pub fn view(&self, buffer: BufferHandle) -> Option<BufferView> {
        self.state().buffers.get(&buffer).cloned()
    }

    /// How many times the surface took focus.
    pub fn focus_count(&self) -> u64 {
        self.state().focus_count
    }

    /// Applies a user edit to `buffer` and reports it as `docchange`.
    /// Returns `false` for an unknown buffer.
    pub fn edit<F>(&self, buffer: BufferHandle, f: F) -> bool
    where
        F: FnOnce(&mut String),
    {
        {
            let mut state = self.state();
            let Some(view) = state.buffers.get_mut(&buffer) else {
                return false;
            };
            f(&mut view.text);
        }
        self.events.publish(AppEvent::DocChange(buffer));
        true
    }

    /// Appends a line typed by the user to the active buffer.
    pub fn type_line(&self, line: &str) -> bool {
        let Some(active) = self.active_buffer() else {
            return false;
        };
        self.edit(active, |text| {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(line);
        })
    }
}

impl EditorSurface for HeadlessEditor {
    fn create_buffer(&self) -> BufferHandle {
        let mut state = self.state();
        state.next_handle += 1;
        let handle = BufferHandle(state.next_handle);
        state.buffers.insert(handle, BufferView::default());
        handle
    }

    fn activate_buffer(&self, buffer: BufferHandle) {
        let mut state = self.state();
        if state.buffers.contains_key(&buffer) {
            state.active = Some(buffer);
        } else {
            tracing::warn!("[Editor] activate of unknown {}", buffer);
        }
    }

    fn focus(&self) {
        self.state().focus_count += 1;
    }

    fn buffer_text(&self, buffer: BufferHandle) -> String {
        self.state()
            .buffers
            .get(&buffer)
            .map(|view| view.text.clone())
            .unwrap_or_default()
    }

    fn set_buffer_text(&self, buffer: BufferHandle, text: &str) {
        if let Some(view) = self.state().buffers.get_mut(&buffer) {
            view.text = text.to_string();
        }
    }

    fn set_tab_width(&self, buffer: BufferHandle, width: u32) {
        if let Some(view) = self.state().buffers.get_mut(&buffer) {
            view.tab_width = width;
        }
    }

    fn set_wrap_mode(&self, buffer: BufferHandle, wrap: bool) {
        if let Some(view) = self.state().buffers.get_mut(&buffer) {
            view.wrap = wrap;
        }
    }
}
