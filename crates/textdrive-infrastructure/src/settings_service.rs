//! File-backed editor settings.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use textdrive_core::settings::{EditorSettings, SettingKey, SettingValue, SettingsService};
use textdrive_core::{AppEvent, EventBus, Result, TextDriveError};

use crate::paths::TextDrivePaths;
use crate::storage::AtomicTomlFile;

/// Editor settings persisted to `settings.toml`.
///
/// [`TomlSettingsService::load`] publishes `settingsready` once the file has
/// been read; each `set` writes through and publishes `settingschange`.
pub struct TomlSettingsService {
    file: AtomicTomlFile<EditorSettings>,
    settings: RwLock<EditorSettings>,
    ready: AtomicBool,
    events: EventBus,
}

impl TomlSettingsService {
    /// Creates the service with default values; call [`Self::load`] next.
    pub fn new(paths: &TextDrivePaths, events: EventBus) -> Self {
        Self {
            file: AtomicTomlFile::new(paths.settings_file()),
            settings: RwLock::new(EditorSettings::default()),
            ready: AtomicBool::new(false),
            events,
        }
    }

    /// Reads the stored settings. An unreadable file keeps the defaults.
    pub fn load(&self) {
        let loaded = match self.file.load() {
            Ok(stored) => stored.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("[Settings] failed to read settings, using defaults: {}", e);
                EditorSettings::default()
            }
        };

        match self.settings.write() {
            Ok(mut settings) => *settings = loaded,
            Err(poisoned) => *poisoned.into_inner() = loaded,
        }
        self.ready.store(true, Ordering::SeqCst);
        tracing::debug!("[Settings] ready");
        self.events.publish(AppEvent::SettingsReady);
    }
}

impl SettingsService for TomlSettingsService {
    fn get(&self, key: SettingKey) -> SettingValue {
        match self.settings.read() {
            Ok(settings) => settings.get(key),
            Err(poisoned) => poisoned.into_inner().get(key),
        }
    }

    fn set(&self, key: SettingKey, value: SettingValue) -> Result<()> {
        let snapshot = {
            let mut settings = self
                .settings
                .write()
                .map_err(|e| TextDriveError::internal(format!("settings lock poisoned: {e}")))?;
            settings.set(key, value)?;
            settings.clone()
        };

        if let Err(e) = self.file.save(&snapshot) {
            tracing::warn!("[Settings] failed to persist {}: {}", key, e);
        }
        tracing::debug!("[Settings] {} = {}", key, value);
        self.events.publish(AppEvent::SettingsChange { key, value });
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_publishes_ready() {
        let temp_dir = TempDir::new().unwrap();
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        let service = TomlSettingsService::new(&TextDrivePaths::with_root(temp_dir.path()), bus);

        assert!(!service.is_ready());
        service.load();

        assert!(service.is_ready());
        assert_eq!(sub.try_next(), Some(AppEvent::SettingsReady));
        assert_eq!(service.get(SettingKey::TabSize), SettingValue::Integer(2));
    }

    #[test]
    fn test_set_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TextDrivePaths::with_root(temp_dir.path());
        let bus = EventBus::new();
        let mut sub = bus.subscribe();

        let service = TomlSettingsService::new(&paths, bus.clone());
        service.load();
        service
            .set(SettingKey::Autosave, SettingValue::Bool(true))
            .unwrap();

        let events = sub.drain();
        assert_eq!(
            events.last(),
            Some(&AppEvent::SettingsChange {
                key: SettingKey::Autosave,
                value: SettingValue::Bool(true)
            })
        );

        let reloaded = TomlSettingsService::new(&paths, bus);
        reloaded.load();
        assert_eq!(reloaded.get(SettingKey::Autosave), SettingValue::Bool(true));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TextDrivePaths::with_root(temp_dir.path());
        std::fs::create_dir_all(paths.config_dir()).unwrap();
        std::fs::write(paths.settings_file(), "tabsize = \"wide\"").unwrap();

        let service = TomlSettingsService::new(&paths, EventBus::new());
        service.load();
        assert_eq!(service.snapshot(), EditorSettings::default());
    }
}
