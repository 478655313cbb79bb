//! Application event loop.
//!
//! [`TextDriveApp`] is the single owner of the document registry. It pumps
//! the event bus and routes each event to the component reacting to it.

use std::sync::Arc;

use textdrive_core::settings::{SettingKey, SettingsService};
use textdrive_core::ui::{self, BUTTON_OK, DialogButton, DialogService};
use textdrive_core::{AppEvent, EventBus, EventSubscription};

use crate::auth_session::AuthSession;
use crate::document_registry::DocumentRegistry;

pub const AUTH_REQUIRED_MESSAGE: &str = "Authorization is required";

/// HTTP status the provider answers with once the access token expired.
const UNAUTHORIZED: u16 = 401;

pub struct TextDriveApp {
    auth: Arc<AuthSession>,
    registry: DocumentRegistry,
    settings: Arc<dyn SettingsService>,
    dialog: Arc<dyn DialogService>,
    subscription: EventSubscription,
    started: bool,
}

impl TextDriveApp {
    /// Subscribes to `events` right away so nothing published after
    /// construction is missed.
    pub fn new(
        auth: Arc<AuthSession>,
        registry: DocumentRegistry,
        settings: Arc<dyn SettingsService>,
        dialog: Arc<dyn DialogService>,
        events: &EventBus,
    ) -> Self {
        Self {
            auth,
            registry,
            settings,
            dialog,
            subscription: events.subscribe(),
            started: false,
        }
    }

    /// Attempts silent authorization and handles everything that follows,
    /// including the interactive prompt and the session restore.
    pub async fn start(&mut self) {
        tracing::info!("[App] starting");
        self.auth.start().await;
        self.process_pending().await;
    }

    /// Whether documents were initialized from the session.
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn auth(&self) -> &Arc<AuthSession> {
        &self.auth
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DocumentRegistry {
        &mut self.registry
    }

    /// Dispatches queued events until the bus is quiet. Returns how many
    /// events were handled.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.subscription.try_next() {
            self.dispatch(event).await;
            handled += 1;
        }
        handled
    }

    /// Saves pending work before the process exits when autosave is on.
    pub async fn shutdown(&mut self) {
        self.process_pending().await;
        let autosave = self
            .settings
            .get(SettingKey::Autosave)
            .as_bool()
            .unwrap_or(false);
        if autosave {
            let saved = self.registry.save_all_pending().await;
            tracing::info!("[App] autosaved {} document(s) on exit", saved);
        }
        self.process_pending().await;
    }

    async fn dispatch(&mut self, event: AppEvent) {
        tracing::trace!(event = event.name(), "[App] dispatch");
        match event {
            AppEvent::Authed => {
                if self.started {
                    return;
                }
                self.started = true;
                self.registry.restore_session().await;
            }
            AppEvent::RequiresPopup => {
                let answer = ui::ask(
                    self.dialog.as_ref(),
                    AUTH_REQUIRED_MESSAGE,
                    vec![DialogButton::new(BUTTON_OK, "Ok")],
                )
                .await;
                if answer.is_some() {
                    self.auth.authorize(true).await;
                }
            }
            AppEvent::UserId(user_id) => {
                self.registry.remember_user_id(&user_id).await;
            }
            AppEvent::Error { code, message } => {
                ui::ask(
                    self.dialog.as_ref(),
                    &format!("Error {code}: {message}"),
                    vec![DialogButton::new(BUTTON_OK, "Ok")],
                )
                .await;
                if code == UNAUTHORIZED && self.auth.is_authorized().await {
                    tracing::info!("[App] token rejected, refreshing silently");
                    self.auth.refresh().await;
                }
            }
            AppEvent::SettingsChange { key, value } => {
                self.registry.on_settings_changed(key, value);
            }
            AppEvent::DocChange(buffer) => {
                if let Err(e) = self.registry.on_doc_changed(buffer) {
                    tracing::error!("[App] {}", e);
                }
            }
            AppEvent::SettingsReady
            | AppEvent::NewTab(_)
            | AppEvent::SwitchTab(_)
            | AppEvent::TabChange(_)
            | AppEvent::TabClosed(_)
            | AppEvent::TabRenamed(_) => {}
        }
    }
}
