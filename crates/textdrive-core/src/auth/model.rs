//! Authorization domain models.

use std::fmt;

/// Scope used to identify the user. Always part of every token request.
pub const IDENTITY_SCOPE: &str = "openid";

/// OAuth client configuration of an [`AuthSession`](crate::auth) owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    client_id: String,
    scopes: Vec<String>,
    user_id: Option<String>,
}

impl AuthConfig {
    /// Creates a configuration. Duplicate scopes are dropped and the identity
    /// scope is appended when missing. An empty `user_id` counts as unknown.
    pub fn new<I, S>(client_id: impl Into<String>, scopes: I, user_id: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered: Vec<String> = Vec::new();
        for scope in scopes.into_iter().map(Into::into) {
            if !scope.is_empty() && !ordered.contains(&scope) {
                ordered.push(scope);
            }
        }
        if !ordered.iter().any(|s| s == IDENTITY_SCOPE) {
            ordered.push(IDENTITY_SCOPE.to_string());
        }

        Self {
            client_id: client_id.into(),
            scopes: ordered,
            user_id: user_id.filter(|id| !id.is_empty()),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// User id known before authorization (e.g. restored from the session).
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

/// Authorization state machine.
///
/// ```text
/// Unauthenticated -> SilentAuthorizing -> Authorized | RequiresInteractive
/// RequiresInteractive -> InteractiveAuthorizing -> Authorized | Unauthenticated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    SilentAuthorizing,
    RequiresInteractive,
    InteractiveAuthorizing,
    Authorized,
}

impl AuthState {
    pub fn is_authorized(self) -> bool {
        matches!(self, Self::Authorized)
    }
}

/// One token request handed to an [`Authorizer`](super::Authorizer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub client_id: String,
    pub scopes: Vec<String>,
    /// Login hint.
    pub user_id: Option<String>,
    /// `false` asks for a silent attempt that must not involve the user.
    pub interactive: bool,
}

/// OAuth bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
}

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.value
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken").field("value", &"<redacted>").finish()
    }
}
