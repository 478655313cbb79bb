use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use textdrive_core::remote::DEFAULT_MIME_TYPE;

mod bootstrap;
mod commands;
mod logging;
mod shell;
mod terminal;

use crate::bootstrap::Workspace;

#[derive(Parser)]
#[command(name = "textdrive")]
#[command(about = "TextDrive - plain text documents stored on Google Drive", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Keep configuration, credentials and session in a throwaway directory
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List remote files
    List,
    /// Print the content of a remote file
    Cat { id: String },
    /// Upload a new file from PATH or stdin
    Push {
        title: String,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_MIME_TYPE)]
        mime: String,
        /// Send the content base64 encoded (for non-UTF-8 data)
        #[arg(long)]
        base64: bool,
    },
    /// Delete a remote file
    Rm { id: String },
    /// Show the stored session
    Session,
    /// Open the stored session in an interactive editing shell
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let workspace = Workspace::open(cli.ephemeral)?;
    let _log_guard = logging::init(&cli.log_level, &workspace.paths.logs_dir());
    tracing::debug!("[App] data dir: {}", workspace.paths.data_dir().display());

    let mut boot = bootstrap::bootstrap(&workspace.paths).await?;

    match cli.command {
        Commands::List => commands::list(&mut boot).await?,
        Commands::Cat { id } => commands::cat(&mut boot, &id).await?,
        Commands::Push {
            title,
            file,
            mime,
            base64,
        } => commands::push(&mut boot, &title, file.as_deref(), &mime, base64).await?,
        Commands::Rm { id } => commands::rm(&mut boot, &id).await?,
        Commands::Session => commands::session(&boot).await?,
        Commands::Shell => shell::run(&mut boot).await?,
    }

    Ok(())
}
