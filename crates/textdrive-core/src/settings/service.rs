//! Settings service trait and an in-memory implementation.

use std::sync::RwLock;

use crate::error::{Result, TextDriveError};
use crate::event::{AppEvent, EventBus};
use crate::settings::model::{EditorSettings, SettingKey, SettingValue};

/// Read access to the editor settings plus change notifications.
///
/// Every successful [`SettingsService::set`] publishes
/// [`AppEvent::SettingsChange`] with the raw new value.
pub trait SettingsService: Send + Sync {
    fn get(&self, key: SettingKey) -> SettingValue;

    fn set(&self, key: SettingKey, value: SettingValue) -> Result<()>;

    /// Whether the persisted settings have been loaded.
    fn is_ready(&self) -> bool;

    fn snapshot(&self) -> EditorSettings {
        let mut settings = EditorSettings::default();
        for key in SettingKey::ALL {
            // Keys and values come from the same table, kinds always match.
            let _ = settings.set(key, self.get(key));
        }
        settings
    }
}

/// Settings kept in memory only.
pub struct InMemorySettingsService {
    settings: RwLock<EditorSettings>,
    events: EventBus,
}

impl InMemorySettingsService {
    pub fn new(settings: EditorSettings, events: EventBus) -> Self {
        Self {
            settings: RwLock::new(settings),
            events,
        }
    }
}

impl SettingsService for InMemorySettingsService {
    fn get(&self, key: SettingKey) -> SettingValue {
        match self.settings.read() {
            Ok(settings) => settings.get(key),
            Err(poisoned) => poisoned.into_inner().get(key),
        }
    }

    fn set(&self, key: SettingKey, value: SettingValue) -> Result<()> {
        {
            let mut settings = self
                .settings
                .write()
                .map_err(|e| TextDriveError::internal(format!("settings lock poisoned: {e}")))?;
            settings.set(key, value)?;
        }
        tracing::debug!("[Settings] {} = {}", key, value);
        self.events.publish(AppEvent::SettingsChange { key, value });
        Ok(())
    }

    fn is_ready(&self) -> bool {
        true
    }
}
