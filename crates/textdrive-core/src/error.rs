//! Error types for TextDrive.

use thiserror::Error;

/// Error code reported for failures that carry no provider or HTTP status.
pub const NO_STATUS_CODE: u16 = 0;

/// A shared error type for the whole TextDrive workspace.
///
/// The variants follow the failure taxonomy of the sync layer: authorization
/// outcomes, remote API and transport failures, and broken internal
/// invariants, plus the usual storage and configuration failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextDriveError {
    /// Silent authorization failed; interactive authorization is required.
    ///
    /// This is a normal state transition, not a user-facing failure.
    #[error("Authorization required")]
    AuthRequired,

    /// Interactive authorization itself failed.
    #[error("Authorization failed: {message}")]
    AuthFailed { code: u16, message: String },

    /// The provider returned an error for an API call.
    #[error("Remote API error {code}: {message}")]
    RemoteApi { code: u16, message: String },

    /// A network-level failure (connection, body read, download).
    #[error("Transport error {code}: {message}")]
    Transport { code: u16, message: String },

    /// An internal invariant was broken.
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TextDriveError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a RemoteApi error
    pub fn remote_api(code: u16, message: impl Into<String>) -> Self {
        Self::RemoteApi {
            code,
            message: message.into(),
        }
    }

    /// Creates a Transport error
    pub fn transport(code: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            code,
            message: message.into(),
        }
    }

    /// Creates an AuthFailed error
    pub fn auth_failed(code: u16, message: impl Into<String>) -> Self {
        Self::AuthFailed {
            code,
            message: message.into(),
        }
    }

    /// Creates a Consistency error
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency(message.into())
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this error only asks for interactive authorization.
    pub fn is_auth_required(&self) -> bool {
        matches!(self, Self::AuthRequired)
    }

    /// Check if this is a remote API or transport failure.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteApi { .. } | Self::Transport { .. })
    }

    /// Check if this is a broken internal invariant.
    pub fn is_consistency(&self) -> bool {
        matches!(self, Self::Consistency(_))
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    // ============================================================================
    // Error event projection
    // ============================================================================

    /// Status code carried by the `error(code, message)` event.
    pub fn code(&self) -> u16 {
        match self {
            Self::AuthFailed { code, .. }
            | Self::RemoteApi { code, .. }
            | Self::Transport { code, .. } => *code,
            Self::AuthRequired => 401,
            Self::NotFound { .. } => 404,
            _ => NO_STATUS_CODE,
        }
    }

    /// Message carried by the `error(code, message)` event.
    pub fn message(&self) -> String {
        match self {
            Self::AuthFailed { message, .. }
            | Self::RemoteApi { message, .. }
            | Self::Transport { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for TextDriveError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for TextDriveError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for TextDriveError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for TextDriveError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, TextDriveError>`.
pub type Result<T> = std::result::Result<T, TextDriveError>;
