pub mod app;
pub mod auth_session;
pub mod document_registry;
pub mod remote_file_client;

pub use app::TextDriveApp;
pub use auth_session::AuthSession;
pub use document_registry::{CloseOutcome, Collaborators, DocumentRegistry, SaveOutcome};
pub use remote_file_client::RemoteFileClient;
