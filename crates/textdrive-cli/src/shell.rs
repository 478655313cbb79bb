//! Interactive editing shell over the headless editor.

use std::borrow::Cow::{self, Borrowed, Owned};

use anyhow::Result;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use textdrive_application::{CloseOutcome, SaveOutcome};
use textdrive_core::document::{LocalId, SaveState};
use textdrive_core::settings::{SettingKey, SettingValue, SettingsService};

use crate::bootstrap::AppBootstrap;

const COMMANDS: [&str; 14] = [
    "tabs", "new", "next", "show", "open", "pick", "append", "print", "save", "saveas", "close",
    "set", "help", "quit",
];

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Tabs,
    New,
    Next,
    Show(LocalId),
    Open(String),
    Pick,
    Append(String),
    Print,
    Save,
    SaveAs,
    Close(Option<LocalId>),
    Set(SettingKey, SettingValue),
    Help,
    Quit,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (name, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        let local_id = |raw: &str| {
            raw.parse::<u64>()
                .map(LocalId)
                .map_err(|_| format!("'{raw}' is not a document number"))
        };

        match name {
            "tabs" => Ok(Self::Tabs),
            "new" => Ok(Self::New),
            "next" => Ok(Self::Next),
            "show" => local_id(rest).map(Self::Show),
            "open" if !rest.is_empty() => Ok(Self::Open(rest.to_string())),
            "open" => Err("usage: open ID".to_string()),
            "pick" => Ok(Self::Pick),
            "append" => Ok(Self::Append(rest.to_string())),
            "print" => Ok(Self::Print),
            "save" => Ok(Self::Save),
            "saveas" => Ok(Self::SaveAs),
            "close" if rest.is_empty() => Ok(Self::Close(None)),
            "close" => local_id(rest).map(|id| Self::Close(Some(id))),
            "set" => {
                let (key, value) = rest
                    .split_once(' ')
                    .ok_or_else(|| "usage: set KEY VALUE".to_string())?;
                let key: SettingKey = key.parse().map_err(|_| format!("unknown setting '{key}'"))?;
                let value = SettingValue::parse_for(key, value).map_err(|e| e.to_string())?;
                Ok(Self::Set(key, value))
            }
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command '{other}', try 'help'")),
        }
    }
}

// ============================================================================
// Line editor helper
// ============================================================================

#[derive(Clone)]
struct ShellHelper;

impl Helper for ShellHelper {}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if line.contains(' ') {
            return Ok((0, vec![]));
        }
        let candidates = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for ShellHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        match line.split_once(' ') {
            Some((cmd, rest)) if COMMANDS.contains(&cmd) => {
                Owned(format!("{} {}", cmd.bright_cyan(), rest))
            }
            None if COMMANDS.contains(&line) => Owned(line.bright_cyan().to_string()),
            _ => Borrowed(line),
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.is_empty() || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Validator for ShellHelper {}

// ============================================================================
// Loop
// ============================================================================

fn print_help() {
    let lines = [
        ("tabs", "list open documents"),
        ("new", "open an empty document"),
        ("next", "show the next document"),
        ("show N", "show document N"),
        ("open ID", "open a remote file by id"),
        ("pick", "choose remote text files to open"),
        ("append TEXT", "type a line into the current document"),
        ("print", "print the current document"),
        ("save", "save the current document"),
        ("saveas", "save a copy under a new name"),
        ("close [N]", "close the current document or document N"),
        ("set KEY VALUE", "change an editor setting"),
        ("quit", "leave the shell"),
    ];
    for (usage, text) in lines {
        println!("  {:<14} {}", usage.bright_cyan(), text.bright_black());
    }
}

fn print_tabs(boot: &AppBootstrap) {
    let registry = boot.app.registry();
    let current = registry.current().map(|d| d.local_id);
    for document in registry.documents() {
        let marker = if Some(document.local_id) == current { "*" } else { " " };
        let state = match document.save_state {
            SaveState::Saved => document.save_state.as_str().green(),
            SaveState::Saving => document.save_state.as_str().yellow(),
            SaveState::Unsaved => document.save_state.as_str().red(),
        };
        println!("{} {:>3}  {}  {}", marker, document.local_id, document.name(), state);
    }
}

/// Runs one command. Returns `false` when the shell should exit.
async fn execute(boot: &mut AppBootstrap, command: ShellCommand) -> Result<bool> {
    match command {
        ShellCommand::Tabs => print_tabs(boot),
        ShellCommand::New => {
            let local_id = boot.app.registry_mut().new_tab(None, None).await;
            println!("opened document {}", local_id);
        }
        ShellCommand::Next => boot.app.registry_mut().next_tab(),
        ShellCommand::Show(local_id) => boot.app.registry_mut().show_tab(local_id)?,
        ShellCommand::Open(id) => {
            if let Some(local_id) = boot.app.registry_mut().open_file_id(&id).await {
                println!("{} is document {}", id, local_id);
            }
        }
        ShellCommand::Pick => {
            let opened = boot.app.registry_mut().open_file().await;
            println!("opened {} document(s)", opened.len());
        }
        ShellCommand::Append(text) => {
            if !boot.editor.type_line(&text) {
                println!("{}", "no active document".bright_black());
            }
        }
        ShellCommand::Print => {
            let registry = boot.app.registry();
            if let Some(text) = registry.current().and_then(|d| registry.text_of(d.local_id)) {
                println!("{}", text);
            }
        }
        ShellCommand::Save => match boot.app.registry_mut().save(None).await? {
            SaveOutcome::Saved => println!("{}", "saved".green()),
            outcome => println!("{}", format!("{outcome:?}").to_lowercase().yellow()),
        },
        ShellCommand::SaveAs => match boot.app.registry_mut().save_as(None).await? {
            SaveOutcome::SavedAs(local_id) => {
                println!("{} as document {}", "saved".green(), local_id)
            }
            SaveOutcome::Saved => println!("{}", "saved".green()),
            outcome => println!("{}", format!("{outcome:?}").to_lowercase().yellow()),
        },
        ShellCommand::Close(target) => {
            let registry = boot.app.registry_mut();
            let outcome = match target {
                Some(local_id) => registry.close(local_id).await?,
                None => registry.close_current().await?,
            };
            if outcome != CloseOutcome::Closed {
                println!("{}", format!("{outcome:?}").to_lowercase().yellow());
            }
        }
        ShellCommand::Set(key, value) => boot.settings.set(key, value)?,
        ShellCommand::Help => print_help(),
        ShellCommand::Quit => return Ok(false),
    }
    Ok(true)
}

pub async fn run(boot: &mut AppBootstrap) -> Result<()> {
    boot.app.start().await;
    if !boot.app.is_started() {
        println!(
            "{}",
            "Not authorized yet, commands will ask for authorization.".bright_black()
        );
    }

    let mut rl: Editor<ShellHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(ShellHelper));

    println!("{}", "=== TextDrive ===".bright_magenta().bold());
    println!("{}", "Type 'help' for commands, 'quit' to exit.".bright_black());
    print_tabs(boot);

    loop {
        let readline = tokio::task::block_in_place(|| rl.readline("textdrive> "));
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                match ShellCommand::parse(&line) {
                    Ok(command) => match execute(boot, command).await {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => eprintln!("{}", format!("Error: {e}").red()),
                    },
                    Err(message) => println!("{}", message.bright_black()),
                }
                boot.app.process_pending().await;
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        }
    }

    boot.app.shutdown().await;
    println!("{}", "Goodbye!".bright_green());
    Ok(())
}
