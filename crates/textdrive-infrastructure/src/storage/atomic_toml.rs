//! Atomic TOML files.
//!
//! Writes go through a temporary sibling file that is synced and renamed over
//! the target, so readers see either the old or the new document.

use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use textdrive_core::TextDriveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtomicTomlError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<AtomicTomlError> for TextDriveError {
    fn from(err: AtomicTomlError) -> Self {
        match err {
            AtomicTomlError::Io { .. } | AtomicTomlError::Lock(_) => {
                TextDriveError::io(err.to_string())
            }
            AtomicTomlError::Parse { .. } | AtomicTomlError::Serialize(_) => {
                TextDriveError::Serialization {
                    format: "TOML".to_string(),
                    message: err.to_string(),
                }
            }
        }
    }
}

/// A typed TOML document stored at a fixed path.
pub struct AtomicTomlFile<T> {
    path: PathBuf,
    private: bool,
    _phantom: PhantomData<T>,
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            private: false,
            _phantom: PhantomData,
        }
    }

    /// Restricts the file to its owner (mode 600 on Unix) on every save.
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the document. A missing or blank file yields `None`.
    pub fn load(&self) -> Result<Option<T>, AtomicTomlError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let data = toml::from_str(&content).map_err(|source| AtomicTomlError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(data))
    }

    pub fn save(&self, data: &T) -> Result<(), AtomicTomlError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let toml_string = toml::to_string_pretty(data)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path).map_err(|e| self.io_error(e))?;
        tmp_file
            .write_all(toml_string.as_bytes())
            .map_err(|e| self.io_error(e))?;
        tmp_file.sync_all().map_err(|e| self.io_error(e))?;
        drop(tmp_file);

        #[cfg(unix)]
        if self.private {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))
                .map_err(|e| self.io_error(e))?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }

    /// Load-modify-save under an exclusive lock.
    pub fn update<F>(&self, default_value: T, f: F) -> Result<T, AtomicTomlError>
    where
        F: FnOnce(&mut T),
    {
        let _lock = FileLock::acquire(&self.path)?;
        let mut data = self.load()?.unwrap_or(default_value);
        f(&mut data);
        self.save(&data)?;
        Ok(data)
    }

    fn temp_path(&self) -> Result<PathBuf, AtomicTomlError> {
        let invalid = |msg: &str| {
            self.io_error(std::io::Error::new(std::io::ErrorKind::InvalidInput, msg))
        };
        let parent = self
            .path
            .parent()
            .ok_or_else(|| invalid("path has no parent directory"))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| invalid("path has no file name"))?;
        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }

    fn io_error(&self, source: std::io::Error) -> AtomicTomlError {
        AtomicTomlError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Exclusive lock held on a sibling `.lock` file until dropped.
struct FileLock {
    _file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, AtomicTomlError> {
        let lock_path = path.with_extension("lock");
        let io_error = |source| AtomicTomlError::Io {
            path: lock_path.clone(),
            source,
        };

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(io_error)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| AtomicTomlError::Lock(format!("failed to acquire lock: {e}")))?;
        }

        Ok(Self {
            _file: file,
            lock_path,
        })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}
