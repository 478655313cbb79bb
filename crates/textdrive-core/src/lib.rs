//! Domain types and collaborator interfaces of TextDrive.
//!
//! TextDrive keeps a set of open text documents synchronized with a remote
//! file store behind an OAuth-gated REST API. This crate holds everything that
//! does not touch the network or the file system: the error type, the event
//! bus, the request builders and multipart encoding, the session string codec
//! with its persisted file index, and the traits implemented by the
//! infrastructure and UI layers.

pub mod auth;
pub mod document;
pub mod error;
pub mod event;
pub mod remote;
pub mod session;
pub mod settings;
pub mod ui;

pub use error::{Result, TextDriveError};
pub use event::{AppEvent, EventBus, EventSubscription};
