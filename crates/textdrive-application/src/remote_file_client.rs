//! Remote file operations.
//!
//! Every operation returns `None` on failure after publishing the matching
//! `error(code, message)` event, so callers treat "no result" plus the event
//! as the failure signal. No call is issued while the session is not
//! authorized; `requirespopup` is published instead.

use std::sync::Arc;

use serde_json::{Map, Value};
use textdrive_core::auth::AccessToken;
use textdrive_core::error::NO_STATUS_CODE;
use textdrive_core::remote::{ApiRequest, DriveTransport, FileList, RemoteFile, UploadContent};
use textdrive_core::{AppEvent, EventBus, Result, TextDriveError};

use crate::auth_session::AuthSession;

pub struct RemoteFileClient {
    auth: Arc<AuthSession>,
    transport: Arc<dyn DriveTransport>,
    events: EventBus,
}

impl RemoteFileClient {
    pub fn new(auth: Arc<AuthSession>, transport: Arc<dyn DriveTransport>, events: EventBus) -> Self {
        Self {
            auth,
            transport,
            events,
        }
    }

    pub fn auth(&self) -> &Arc<AuthSession> {
        &self.auth
    }

    pub async fn list(&self) -> Option<Vec<RemoteFile>> {
        let token = self.token("list").await?;
        let result = async {
            let value = self.transport.execute(&token, &ApiRequest::list()).await?;
            let list: FileList = serde_json::from_value(value)?;
            Ok::<_, TextDriveError>(list.items)
        }
        .await;
        self.settle("list", result)
    }

    /// Fetches metadata of `id`; with `include_content` also downloads the
    /// file body from its `downloadUrl`.
    pub async fn get(&self, id: &str, include_content: bool) -> Option<RemoteFile> {
        let token = self.token("get").await?;
        let result = async {
            let value = self.transport.execute(&token, &ApiRequest::get(id)?).await?;
            let file: RemoteFile = serde_json::from_value(value)?;
            if !include_content {
                return Ok(file);
            }
            let url = file.download_url.clone().ok_or_else(|| {
                TextDriveError::remote_api(
                    NO_STATUS_CODE,
                    format!("File {id} has no downloadable content"),
                )
            })?;
            let content = self.transport.download(&token, &url).await?;
            Ok::<_, TextDriveError>(file.with_content(content))
        }
        .await;
        self.settle("get", result)
    }

    /// Creates a file. `title` and `mime_type` win over the same keys in
    /// `extra_metadata`.
    pub async fn insert(
        &self,
        title: &str,
        mime_type: &str,
        content: Option<&UploadContent>,
        extra_metadata: Option<Map<String, Value>>,
    ) -> Option<RemoteFile> {
        let token = self.token("insert").await?;
        let mut metadata = extra_metadata.unwrap_or_default();
        metadata.insert("title".to_string(), Value::String(title.to_string()));
        metadata.insert("mimeType".to_string(), Value::String(mime_type.to_string()));

        let result = async {
            let request = ApiRequest::insert(metadata, content)?;
            let value = self.transport.execute(&token, &request).await?;
            Ok::<_, TextDriveError>(serde_json::from_value::<RemoteFile>(value)?)
        }
        .await;
        self.settle("insert", result)
    }

    /// Replaces metadata (and optionally content) of an existing file.
    pub async fn update(
        &self,
        metadata: &RemoteFile,
        content: Option<&UploadContent>,
    ) -> Option<RemoteFile> {
        let token = self.token("update").await?;
        let result = async {
            let request = ApiRequest::update(metadata, content)?;
            let value = self.transport.execute(&token, &request).await?;
            Ok::<_, TextDriveError>(serde_json::from_value::<RemoteFile>(value)?)
        }
        .await;
        self.settle("update", result)
    }

    pub async fn delete(&self, id: &str) -> Option<()> {
        let token = self.token("delete").await?;
        let result = async {
            self.transport
                .execute(&token, &ApiRequest::delete(id)?)
                .await?;
            Ok::<_, TextDriveError>(())
        }
        .await;
        self.settle("delete", result)
    }

    async fn token(&self, operation: &str) -> Option<AccessToken> {
        let token = self.auth.access_token().await;
        if token.is_none() {
            tracing::warn!("[Drive] {} skipped: not authorized", operation);
            self.events.publish(AppEvent::RequiresPopup);
        }
        token
    }

    fn settle<T>(&self, operation: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("[Drive] {} failed: {}", operation, e);
                self.events.publish_error(&e);
                None
            }
        }
    }
}
