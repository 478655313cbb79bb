//! One-shot remote file commands.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use textdrive_core::remote::UploadContent;
use textdrive_core::session::SessionParams;
use textdrive_core::session::SessionStore;

use crate::bootstrap::AppBootstrap;

pub async fn list(boot: &mut AppBootstrap) -> Result<()> {
    boot.authorize().await?;
    let Some(files) = boot.client.list().await else {
        return Err(boot.failure("list").await);
    };
    for file in &files {
        println!(
            "{}  {}  {}",
            file.id.bright_black(),
            file.title,
            file.mime_type.bright_black()
        );
    }
    tracing::info!("[App] listed {} file(s)", files.len());
    Ok(())
}

pub async fn cat(boot: &mut AppBootstrap, id: &str) -> Result<()> {
    boot.authorize().await?;
    let Some(file) = boot.client.get(id, true).await else {
        return Err(boot.failure("cat").await);
    };
    print!("{}", file.content.unwrap_or_default());
    Ok(())
}

/// Reads the upload body from `file`, or stdin when absent.
fn read_body(file: Option<&Path>, base64: bool) -> Result<UploadContent> {
    let bytes = match file {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut bytes = Vec::new();
            std::io::stdin()
                .read_to_end(&mut bytes)
                .context("Failed to read stdin")?;
            bytes
        }
    };
    if base64 {
        return Ok(UploadContent::from_bytes(&bytes));
    }
    let text = String::from_utf8(bytes).context("Content is not UTF-8, use --base64")?;
    Ok(UploadContent::plain(text))
}

pub async fn push(
    boot: &mut AppBootstrap,
    title: &str,
    file: Option<&Path>,
    mime_type: &str,
    base64: bool,
) -> Result<()> {
    let content = read_body(file, base64)?;
    boot.authorize().await?;
    let Some(created) = boot
        .client
        .insert(title, mime_type, Some(&content), None)
        .await
    else {
        return Err(boot.failure("push").await);
    };
    println!("{}", created.id);
    Ok(())
}

pub async fn rm(boot: &mut AppBootstrap, id: &str) -> Result<()> {
    boot.authorize().await?;
    if boot.client.delete(id).await.is_none() {
        return Err(boot.failure("rm").await);
    }
    println!("{} {}", "deleted".green(), id);
    Ok(())
}

/// Prints the stored session string. Needs no authorization.
pub async fn session(boot: &AppBootstrap) -> Result<()> {
    let query = boot
        .session_store
        .load()
        .await
        .context("Failed to read session")?;
    let params = SessionParams::parse(&query);

    println!("{} {}", "session:".bright_magenta(), params);
    if let Some(saved_at) = boot.session_store.saved_at().context("Failed to read session")? {
        println!("{} {}", "saved at:".bright_magenta(), saved_at.to_rfc3339());
    }
    match params.user_id.as_deref() {
        Some(user_id) => println!("{} {}", "user:".bright_magenta(), user_id),
        None => println!("{} {}", "user:".bright_magenta(), "unknown".bright_black()),
    }
    for id in &params.file_ids {
        println!("  {}", id);
    }
    Ok(())
}
