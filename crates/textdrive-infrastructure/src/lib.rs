pub mod config_service;
pub mod credential_store;
pub mod headless_editor;
pub mod http_transport;
pub mod oauth_authorizer;
pub mod paths;
pub mod session_store;
pub mod settings_service;
pub mod storage;

pub use crate::config_service::{AppConfig, ConfigService};
pub use crate::credential_store::CredentialStore;
pub use crate::headless_editor::HeadlessEditor;
pub use crate::http_transport::HttpDriveTransport;
pub use crate::oauth_authorizer::{AuthorizationPrompt, OAuthAuthorizer};
pub use crate::paths::TextDrivePaths;
pub use crate::session_store::FileSessionStore;
pub use crate::settings_service::TomlSettingsService;
