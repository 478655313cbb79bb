use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use tempfile::TempDir;
use textdrive_application::{
    AuthSession, Collaborators, DocumentRegistry, RemoteFileClient, TextDriveApp,
};
use textdrive_core::session::PersistedFileIndex;
use textdrive_core::{AppEvent, EventBus, EventSubscription};
use textdrive_infrastructure::{
    ConfigService, CredentialStore, FileSessionStore, HeadlessEditor, HttpDriveTransport,
    OAuthAuthorizer, TextDrivePaths, TomlSettingsService,
};

use crate::terminal::{Console, TerminalAuthPrompt, TerminalDialog, TerminalPicker};

/// Where the process keeps its files.
pub struct Workspace {
    pub paths: TextDrivePaths,
    // Removed on drop.
    _scratch: Option<TempDir>,
}

impl Workspace {
    /// Platform directories, or a throwaway directory when `ephemeral`.
    pub fn open(ephemeral: bool) -> Result<Self> {
        if ephemeral {
            let scratch = TempDir::new().context("Failed to create scratch directory")?;
            return Ok(Self {
                paths: TextDrivePaths::with_root(scratch.path()),
                _scratch: Some(scratch),
            });
        }
        Ok(Self {
            paths: TextDrivePaths::resolve()?,
            _scratch: None,
        })
    }
}

/// Every wired component of a running TextDrive.
pub struct AppBootstrap {
    pub app: TextDriveApp,
    pub auth: Arc<AuthSession>,
    pub client: Arc<RemoteFileClient>,
    pub editor: Arc<HeadlessEditor>,
    pub settings: Arc<TomlSettingsService>,
    pub session_store: Arc<FileSessionStore>,
    events: EventSubscription,
}

/// Composition root.
pub async fn bootstrap(paths: &TextDrivePaths) -> Result<AppBootstrap> {
    let config = ConfigService::new(paths)
        .load()
        .map_err(|e| anyhow!("Failed to load configuration: {}", e))?;
    tracing::debug!("[App] api base url: {}", config.api.base_url);

    let bus = EventBus::new();
    let events = bus.subscribe();
    let console = Arc::new(Console::new().context("Failed to open terminal")?);

    let settings = Arc::new(TomlSettingsService::new(paths, bus.clone()));
    settings.load();

    let session_store = Arc::new(FileSessionStore::new(paths));
    let index = PersistedFileIndex::load(session_store.clone()).await;

    let authorizer = Arc::new(OAuthAuthorizer::new(
        config.auth.clone(),
        CredentialStore::new(paths),
        Arc::new(TerminalAuthPrompt::new(console.clone())),
    ));
    let auth_config = config.auth_config(index.user_id().map(str::to_string));
    let auth = Arc::new(AuthSession::new(auth_config, authorizer, bus.clone()));

    let transport = Arc::new(HttpDriveTransport::new(config.api.base_url.clone()));
    let client = Arc::new(RemoteFileClient::new(auth.clone(), transport, bus.clone()));

    let editor = Arc::new(HeadlessEditor::new(bus.clone()));
    let dialog = Arc::new(TerminalDialog::new(console.clone()));
    let collaborators = Collaborators {
        editor: editor.clone(),
        dialog: dialog.clone(),
        picker: Arc::new(TerminalPicker::new(console.clone(), client.clone())),
        settings: settings.clone(),
    };
    let registry = DocumentRegistry::new(index, client.clone(), collaborators, bus.clone());
    let app = TextDriveApp::new(auth.clone(), registry, settings.clone(), dialog, &bus);

    Ok(AppBootstrap {
        app,
        auth,
        client,
        editor,
        settings,
        session_store,
        events,
    })
}

impl AppBootstrap {
    /// Authorizes without the event loop: silently first, then through the
    /// terminal code prompt.
    pub async fn authorize(&mut self) -> Result<()> {
        if !self.auth.start().await.is_authorized()
            && !self.auth.authorize(true).await.is_authorized()
        {
            let reason = self
                .take_error()
                .await
                .map(|(code, message)| format!("Error {code}: {message}"))
                .unwrap_or_else(|| "authorization cancelled".to_string());
            bail!("Not authorized: {}", reason);
        }
        self.take_error().await;
        Ok(())
    }

    /// Drains the events seen so far, storing a resolved user id, and
    /// returns the last error event.
    pub async fn take_error(&mut self) -> Option<(u16, String)> {
        let mut last_error = None;
        for event in self.events.drain() {
            match event {
                AppEvent::UserId(user_id) => {
                    self.app.registry_mut().remember_user_id(&user_id).await;
                }
                AppEvent::Error { code, message } => last_error = Some((code, message)),
                _ => {}
            }
        }
        last_error
    }

    /// Turns a failed client call into an error carrying the published event.
    pub async fn failure(&mut self, operation: &str) -> anyhow::Error {
        match self.take_error().await {
            Some((code, message)) => anyhow!("{} failed: Error {}: {}", operation, code, message),
            None => anyhow!("{} failed", operation),
        }
    }
}
