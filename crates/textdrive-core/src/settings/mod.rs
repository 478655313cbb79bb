pub mod model;
pub mod service;

pub use model::{EditorSettings, FALLBACK_TAB_SIZE, SettingKey, SettingValue};
pub use service::{InMemorySettingsService, SettingsService};
