//! Path management for TextDrive files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/textdrive/         # Config directory
//! ├── config.toml              # Application configuration
//! ├── settings.toml            # Editor settings
//! ├── credentials.toml         # Cached OAuth tokens (0600)
//! └── logs/                    # Application logs
//!     └── textdrive.log.YYYY-MM-DD
//!
//! ~/.local/share/textdrive/    # Data directory
//! └── session.toml             # Session restoration string
//! ```

use std::path::{Path, PathBuf};

use textdrive_core::TextDriveError;
use thiserror::Error;

const APP_DIR_NAME: &str = "textdrive";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("Cannot find the platform config directory")]
    ConfigDirNotFound,
    #[error("Cannot find the platform data directory")]
    DataDirNotFound,
}

impl From<PathError> for TextDriveError {
    fn from(err: PathError) -> Self {
        TextDriveError::config(err.to_string())
    }
}

/// Resolved locations of every file TextDrive reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDrivePaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl TextDrivePaths {
    /// Resolves the platform directories (XDG on Linux, the native locations
    /// on macOS and Windows).
    pub fn resolve() -> Result<Self, PathError> {
        let config_dir = dirs::config_dir()
            .ok_or(PathError::ConfigDirNotFound)?
            .join(APP_DIR_NAME);
        let data_dir = dirs::data_dir()
            .ok_or(PathError::DataDirNotFound)?
            .join(APP_DIR_NAME);
        Ok(Self {
            config_dir,
            data_dir,
        })
    }

    /// Places every file under `root`. Used for tests and ephemeral runs.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.toml")
    }

    /// # Security Note
    ///
    /// Holds refresh tokens. Written with mode 600 on Unix.
    pub fn credentials_file(&self) -> PathBuf {
        self.config_dir.join("credentials.toml")
    }

    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join("session.toml")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.config_dir.join("logs")
    }
}
