//! In-process publish/subscribe bus.
//!
//! Components obtain a publish capability by holding a clone of [`EventBus`]
//! and a subscribe capability through [`EventBus::subscribe`]. Delivery order
//! to every subscriber is publish order.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use crate::document::DocumentSummary;
use crate::error::TextDriveError;
use crate::settings::{SettingKey, SettingValue};
use crate::ui::BufferHandle;

/// Buffered events per subscriber before the slowest one starts lagging.
pub const DEFAULT_CAPACITY: usize = 256;

/// Every event the sync layer emits.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Authorization succeeded.
    Authed,
    /// Silent authorization failed; an interactive attempt is needed.
    RequiresPopup,
    /// The identity lookup resolved the current user id.
    UserId(String),
    /// A remote, transport or interactive-auth failure.
    Error { code: u16, message: String },
    NewTab(DocumentSummary),
    SwitchTab(DocumentSummary),
    TabChange(DocumentSummary),
    TabClosed(DocumentSummary),
    TabRenamed(DocumentSummary),
    /// A setting changed; carries the raw new value.
    SettingsChange { key: SettingKey, value: SettingValue },
    SettingsReady,
    /// The editing surface reports a user edit of this buffer.
    DocChange(BufferHandle),
}

impl AppEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Authed => "authed",
            Self::RequiresPopup => "requirespopup",
            Self::UserId(_) => "userId",
            Self::Error { .. } => "error",
            Self::NewTab(_) => "newtab",
            Self::SwitchTab(_) => "switchtab",
            Self::TabChange(_) => "tabchange",
            Self::TabClosed(_) => "tabclosed",
            Self::TabRenamed(_) => "tabrenamed",
            Self::SettingsChange { .. } => "settingschange",
            Self::SettingsReady => "settingsready",
            Self::DocChange(_) => "docchange",
        }
    }

    /// Builds the unified error event for a failure.
    pub fn error(err: &TextDriveError) -> Self {
        Self::Error {
            code: err.code(),
            message: err.message(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Publishes an event. Events published with no subscriber are dropped.
    pub fn publish(&self, event: AppEvent) {
        tracing::trace!(event = event.name(), "[Bus] publish");
        let _ = self.tx.send(event);
    }

    /// Publishes the unified `error(code, message)` event for `err`.
    pub fn publish_error(&self, err: &TextDriveError) {
        tracing::warn!(code = err.code(), "[Bus] error event: {}", err.message());
        self.publish(AppEvent::error(err));
    }
}

/// Receiving half of an [`EventBus`] subscription.
pub struct EventSubscription {
    rx: broadcast::Receiver<AppEvent>,
}

impl EventSubscription {
    /// Returns the next queued event without waiting.
    ///
    /// A lagging subscriber skips the overwritten events and keeps going.
    pub fn try_next(&mut self) -> Option<AppEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("[Bus] subscriber lagged, {} events skipped", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Waits for the next event. Returns `None` once every publisher is gone.
    pub async fn next(&mut self) -> Option<AppEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("[Bus] subscriber lagged, {} events skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Takes every event queued so far.
    pub fn drain(&mut self) -> Vec<AppEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}
