//! Terminal implementations of the interactive collaborators.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use textdrive_application::RemoteFileClient;
use textdrive_core::ui::{DialogButton, DialogService, FilePicker};
use textdrive_infrastructure::AuthorizationPrompt;

/// Line input shared by every prompt.
pub struct Console {
    editor: Mutex<DefaultEditor>,
}

impl Console {
    pub fn new() -> rustyline::Result<Self> {
        Ok(Self {
            editor: Mutex::new(DefaultEditor::new()?),
        })
    }

    /// Reads one line. `None` on Ctrl-C, Ctrl-D or a terminal failure.
    pub fn read_line(&self, prompt: &str) -> Option<String> {
        tokio::task::block_in_place(|| {
            let mut editor = self.editor.lock().unwrap_or_else(PoisonError::into_inner);
            match editor.readline(prompt) {
                Ok(line) => Some(line),
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => None,
                Err(e) => {
                    tracing::warn!("[App] terminal read failed: {}", e);
                    None
                }
            }
        })
    }
}

// ============================================================================
// Dialog
// ============================================================================

#[derive(Default)]
struct PendingDialog {
    message: String,
    buttons: Vec<DialogButton>,
}

pub struct TerminalDialog {
    console: Arc<Console>,
    pending: Mutex<PendingDialog>,
}

impl TerminalDialog {
    pub fn new(console: Arc<Console>) -> Self {
        Self {
            console,
            pending: Mutex::new(PendingDialog::default()),
        }
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, PendingDialog> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Finds the button an answer refers to: its id, its label, or the first
/// letter of either.
pub fn match_button<'a>(buttons: &'a [DialogButton], answer: &str) -> Option<&'a DialogButton> {
    let answer = answer.trim().to_lowercase();
    if answer.is_empty() {
        return None;
    }
    buttons
        .iter()
        .find(|b| b.id == answer || b.label.to_lowercase() == answer)
        .or_else(|| {
            buttons.iter().find(|b| {
                answer.len() == 1
                    && (b.id.starts_with(&answer) || b.label.to_lowercase().starts_with(&answer))
            })
        })
}

#[async_trait]
impl DialogService for TerminalDialog {
    fn set_message(&self, message: &str) {
        self.pending().message = message.to_string();
    }

    fn set_buttons(&self, buttons: Vec<DialogButton>) {
        self.pending().buttons = buttons;
    }

    async fn show(&self) -> Option<String> {
        let PendingDialog { message, buttons } = std::mem::take(&mut *self.pending());
        println!("{}", message.bright_yellow());

        // A single button is an acknowledgement, nothing to choose.
        if buttons.len() <= 1 {
            return buttons.into_iter().next().map(|b| b.id);
        }

        let choices: Vec<String> = buttons
            .iter()
            .map(|b| format!("[{}] {}", b.id, b.label))
            .collect();
        loop {
            let answer = self.console.read_line(&format!("{} > ", choices.join("  ")))?;
            match match_button(&buttons, &answer) {
                Some(button) => return Some(button.id.clone()),
                None => println!("{}", "Please pick one of the listed answers.".bright_black()),
            }
        }
    }

    async fn prompt(&self, message: &str) -> Option<String> {
        self.console.read_line(&format!("{} > ", message.bright_yellow()))
    }
}

// ============================================================================
// Authorization code prompt
// ============================================================================

pub struct TerminalAuthPrompt {
    console: Arc<Console>,
}

impl TerminalAuthPrompt {
    pub fn new(console: Arc<Console>) -> Self {
        Self { console }
    }
}

#[async_trait]
impl AuthorizationPrompt for TerminalAuthPrompt {
    async fn request_code(&self, authorization_url: &str) -> Option<String> {
        println!(
            "{}",
            "Open this URL in a browser and grant access:".bright_yellow()
        );
        println!("  {}", authorization_url.bright_cyan());
        self.console
            .read_line("Authorization code > ")
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
    }
}

// ============================================================================
// File picker
// ============================================================================

/// Lists remote files of the requested types and lets the user choose.
pub struct TerminalPicker {
    console: Arc<Console>,
    client: Arc<RemoteFileClient>,
}

impl TerminalPicker {
    pub fn new(console: Arc<Console>, client: Arc<RemoteFileClient>) -> Self {
        Self { console, client }
    }
}

/// Parses a selection such as `1,3 4` into zero-based indices below `len`.
/// Unknown entries are skipped and duplicates dropped.
pub fn parse_selection(input: &str, len: usize) -> Vec<usize> {
    let mut picked = Vec::new();
    for token in input.split([',', ' ']).filter(|t| !t.is_empty()) {
        let Ok(number) = token.parse::<usize>() else {
            continue;
        };
        if (1..=len).contains(&number) && !picked.contains(&(number - 1)) {
            picked.push(number - 1);
        }
    }
    picked
}

#[async_trait]
impl FilePicker for TerminalPicker {
    async fn pick(&self, title: &str, mime_types: &[&str]) -> Vec<String> {
        let Some(files) = self.client.list().await else {
            return Vec::new();
        };
        let files: Vec<_> = files
            .into_iter()
            .filter(|f| mime_types.is_empty() || mime_types.contains(&f.mime_type.as_str()))
            .collect();

        println!("{}", title.bright_magenta().bold());
        if files.is_empty() {
            println!("{}", "No matching files.".bright_black());
            return Vec::new();
        }
        for (i, file) in files.iter().enumerate() {
            println!("  {:>3}  {}  {}", i + 1, file.title, file.id.bright_black());
        }

        let Some(answer) = self.console.read_line("Select (e.g. 1,3) > ") else {
            return Vec::new();
        };
        parse_selection(&answer, files.len())
            .into_iter()
            .map(|i| files[i].id.clone())
            .collect()
    }
}
