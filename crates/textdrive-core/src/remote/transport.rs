use async_trait::async_trait;
use serde_json::Value;

use crate::auth::AccessToken;
use crate::error::Result;
use crate::remote::request::ApiRequest;

/// Executes API requests against the remote provider.
///
/// Implementations map provider error bodies to
/// [`TextDriveError::RemoteApi`](crate::TextDriveError::RemoteApi) and
/// network failures to [`TextDriveError::Transport`](crate::TextDriveError::Transport).
#[async_trait]
pub trait DriveTransport: Send + Sync {
    /// Executes `request` and returns the decoded JSON response.
    /// Empty responses (e.g. a delete) decode to `Value::Null`.
    async fn execute(&self, token: &AccessToken, request: &ApiRequest) -> Result<Value>;

    /// Downloads a file body with an `Authorization: Bearer` header.
    async fn download(&self, token: &AccessToken, url: &str) -> Result<String>;
}
