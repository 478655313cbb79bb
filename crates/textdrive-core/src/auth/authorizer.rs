//! Token provider trait.

use async_trait::async_trait;

use crate::auth::model::{AccessToken, AuthRequest};
use crate::error::Result;

/// Obtains OAuth tokens and resolves the identity behind them.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Requests an access token.
    ///
    /// A silent request (`interactive == false`) must never involve the user
    /// and fails with [`TextDriveError::AuthRequired`](crate::TextDriveError::AuthRequired)
    /// when cached credentials are not enough.
    async fn request_token(&self, request: &AuthRequest) -> Result<AccessToken>;

    /// Looks up the provider's user id for `token`.
    async fn lookup_user_id(&self, token: &AccessToken) -> Result<Option<String>>;

    /// Drops `token` from any cache after the provider rejected it, so the
    /// next silent request has to obtain a new one.
    async fn invalidate(&self, token: &AccessToken);
}
