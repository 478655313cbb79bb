//! Authorization session.
//!
//! Drives the silent then interactive authorization flow and owns the token
//! and user id for the lifetime of the process.

use std::sync::Arc;

use textdrive_core::auth::{AccessToken, AuthConfig, AuthRequest, AuthState, Authorizer};
use textdrive_core::{AppEvent, EventBus};
use tokio::sync::RwLock;

struct SessionState {
    state: AuthState,
    token: Option<AccessToken>,
    user_id: Option<String>,
}

/// Gate of every remote call.
///
/// Once authorized the session stays authorized: later failed attempts keep
/// the previous token. A known user id is never cleared.
pub struct AuthSession {
    config: AuthConfig,
    authorizer: Arc<dyn Authorizer>,
    events: EventBus,
    inner: RwLock<SessionState>,
}

impl AuthSession {
    pub fn new(config: AuthConfig, authorizer: Arc<dyn Authorizer>, events: EventBus) -> Self {
        let user_id = config.user_id().map(str::to_string);
        Self {
            config,
            authorizer,
            events,
            inner: RwLock::new(SessionState {
                state: AuthState::Unauthenticated,
                token: None,
                user_id,
            }),
        }
    }

    /// Attempts silent authorization.
    pub async fn start(&self) -> AuthState {
        self.authorize(false).await
    }

    /// Requests a token and returns the resulting state.
    ///
    /// Success publishes `authed`, followed by `userId` when the user was not
    /// known yet and the identity lookup found one. A failed silent attempt
    /// publishes `requirespopup`; a failed interactive attempt publishes
    /// `error`.
    pub async fn authorize(&self, interactive: bool) -> AuthState {
        let (was_authorized, user_id) = {
            let mut inner = self.inner.write().await;
            let was_authorized = inner.state.is_authorized();
            if !was_authorized {
                inner.state = if interactive {
                    AuthState::InteractiveAuthorizing
                } else {
                    AuthState::SilentAuthorizing
                };
            }
            (was_authorized, inner.user_id.clone())
        };

        let request = AuthRequest {
            client_id: self.config.client_id().to_string(),
            scopes: self.config.scopes().to_vec(),
            user_id: user_id.clone(),
            interactive,
        };

        match self.authorizer.request_token(&request).await {
            Ok(token) => {
                {
                    let mut inner = self.inner.write().await;
                    inner.state = AuthState::Authorized;
                    inner.token = Some(token.clone());
                }
                tracing::info!("[Auth] authorized (interactive: {})", interactive);
                self.events.publish(AppEvent::Authed);

                if user_id.is_none() {
                    self.resolve_user_id(&token).await;
                }
                AuthState::Authorized
            }
            Err(e) if !interactive => {
                if !e.is_auth_required() {
                    tracing::warn!("[Auth] silent authorization failed: {}", e);
                }
                let state = self
                    .settle_failure(was_authorized, AuthState::RequiresInteractive)
                    .await;
                self.events.publish(AppEvent::RequiresPopup);
                state
            }
            Err(e) => {
                tracing::warn!("[Auth] interactive authorization failed: {}", e);
                let state = self
                    .settle_failure(was_authorized, AuthState::Unauthenticated)
                    .await;
                self.events.publish_error(&e);
                state
            }
        }
    }

    /// Replaces a token the provider rejected: the authorizer forgets it and
    /// a silent request runs again.
    pub async fn refresh(&self) -> AuthState {
        let rejected = self.inner.read().await.token.clone();
        if let Some(token) = rejected {
            self.authorizer.invalidate(&token).await;
        }
        self.authorize(false).await
    }

    async fn settle_failure(&self, was_authorized: bool, fallback: AuthState) -> AuthState {
        let mut inner = self.inner.write().await;
        inner.state = if was_authorized {
            AuthState::Authorized
        } else {
            fallback
        };
        inner.state
    }

    async fn resolve_user_id(&self, token: &AccessToken) {
        match self.authorizer.lookup_user_id(token).await {
            Ok(Some(id)) if !id.is_empty() => {
                {
                    let mut inner = self.inner.write().await;
                    if inner.user_id.is_some() {
                        return;
                    }
                    inner.user_id = Some(id.clone());
                }
                tracing::debug!("[Auth] user id resolved");
                self.events.publish(AppEvent::UserId(id));
            }
            Ok(_) => tracing::debug!("[Auth] identity lookup returned no id"),
            Err(e) => self.events.publish_error(&e),
        }
    }

    pub async fn state(&self) -> AuthState {
        self.inner.read().await.state
    }

    pub async fn is_authorized(&self) -> bool {
        self.inner.read().await.state.is_authorized()
    }

    /// Current token, only while authorized.
    pub async fn access_token(&self) -> Option<AccessToken> {
        let inner = self.inner.read().await;
        if inner.state.is_authorized() {
            inner.token.clone()
        } else {
            None
        }
    }

    pub async fn user_id(&self) -> Option<String> {
        self.inner.read().await.user_id.clone()
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}
