//! OAuth 2.0 authorizer for installed applications.
//!
//! Silent requests use the cached access token or exchange the cached
//! refresh token. Interactive requests hand an authorization URL to an
//! [`AuthorizationPrompt`] and exchange the returned code.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Url};
use serde::Deserialize;
use textdrive_core::auth::{AccessToken, AuthRequest, Authorizer};
use textdrive_core::error::NO_STATUS_CODE;
use textdrive_core::{Result, TextDriveError};
use tokio::sync::Mutex;

use crate::config_service::AuthSection;
use crate::credential_store::{CredentialStore, StoredCredentials};

/// Asks the user to visit an authorization URL and paste back the code.
#[async_trait]
pub trait AuthorizationPrompt: Send + Sync {
    /// `None` when the user gave up.
    async fn request_code(&self, authorization_url: &str) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    sub: Option<String>,
}

pub struct OAuthAuthorizer {
    client: Client,
    config: AuthSection,
    credentials: CredentialStore,
    prompt: Arc<dyn AuthorizationPrompt>,
    cache: Mutex<Option<StoredCredentials>>,
}

impl OAuthAuthorizer {
    pub fn new(
        config: AuthSection,
        credentials: CredentialStore,
        prompt: Arc<dyn AuthorizationPrompt>,
    ) -> Self {
        Self {
            client: Client::new(),
            config,
            credentials,
            prompt,
            cache: Mutex::new(None),
        }
    }

    /// Builds the URL the user visits to grant access.
    pub fn authorization_url(&self, request: &AuthRequest) -> Result<String> {
        let mut url = Url::parse(&self.config.auth_endpoint).map_err(|e| {
            TextDriveError::config(format!(
                "invalid auth endpoint '{}': {e}",
                self.config.auth_endpoint
            ))
        })?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &request.client_id)
                .append_pair("redirect_uri", &self.config.redirect_uri)
                .append_pair("response_type", "code")
                .append_pair("scope", &request.scopes.join(" "))
                .append_pair("access_type", "offline");
            if let Some(user_id) = request.user_id.as_deref() {
                query.append_pair("login_hint", user_id);
            }
        }
        Ok(url.into())
    }

    async fn silent_token(&self, request: &AuthRequest) -> Result<AccessToken> {
        let mut creds = self.cached_credentials(&request.client_id).await;

        if let Some(token) = creds.valid_access_token(Utc::now()) {
            tracing::debug!("[Auth] using cached access token");
            return Ok(AccessToken::new(token));
        }

        let Some(refresh_token) = creds.refresh_token.clone() else {
            return Err(TextDriveError::AuthRequired);
        };

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", request.client_id.as_str()),
        ];
        match self.token_request(&params).await {
            Ok(response) => Ok(self.store_token(&mut creds, response).await),
            Err(e) => {
                tracing::info!("[Auth] refresh failed, interactive authorization needed: {}", e);
                Err(TextDriveError::AuthRequired)
            }
        }
    }

    async fn interactive_token(&self, request: &AuthRequest) -> Result<AccessToken> {
        let url = self.authorization_url(request)?;
        let code = self
            .prompt
            .request_code(&url)
            .await
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| TextDriveError::auth_failed(NO_STATUS_CODE, "Authorization cancelled"))?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("client_id", request.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        let response = self.token_request(&params).await?;

        let mut creds = self.cached_credentials(&request.client_id).await;
        Ok(self.store_token(&mut creds, response).await)
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let mut form: Vec<(&str, &str)> = params.to_vec();
        if let Some(secret) = self.config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let response = self
            .client
            .post(&self.config.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| TextDriveError::auth_failed(NO_STATUS_CODE, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TextDriveError::auth_failed(status.as_u16(), e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<OAuthErrorBody>(&body)
                .ok()
                .map(|err| err.error_description.unwrap_or(err.error))
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(TextDriveError::auth_failed(status.as_u16(), message));
        }

        serde_json::from_str(&body)
            .map_err(|e| TextDriveError::auth_failed(status.as_u16(), e.to_string()))
    }

    async fn cached_credentials(&self, client_id: &str) -> StoredCredentials {
        let mut cache = self.cache.lock().await;
        if let Some(creds) = cache.as_ref().filter(|c| c.client_id == client_id) {
            return creds.clone();
        }
        let loaded = self.credentials.load(client_id).unwrap_or_else(|e| {
            tracing::warn!("[Auth] failed to read cached credentials: {}", e);
            StoredCredentials {
                client_id: client_id.to_string(),
                ..Default::default()
            }
        });
        *cache = Some(loaded.clone());
        loaded
    }

    async fn store_token(
        &self,
        creds: &mut StoredCredentials,
        response: TokenResponse,
    ) -> AccessToken {
        let token = AccessToken::new(response.access_token.clone());
        creds.record_token(
            response.access_token,
            response.expires_in,
            response.refresh_token,
            Utc::now(),
        );
        if let Err(e) = self.credentials.save(creds) {
            tracing::warn!("[Auth] failed to cache credentials: {}", e);
        }
        *self.cache.lock().await = Some(creds.clone());
        token
    }
}

#[async_trait]
impl Authorizer for OAuthAuthorizer {
    async fn request_token(&self, request: &AuthRequest) -> Result<AccessToken> {
        if request.interactive {
            tracing::info!("[Auth] starting interactive authorization");
            self.interactive_token(request).await
        } else {
            self.silent_token(request).await
        }
    }

    async fn lookup_user_id(&self, token: &AccessToken) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.config.userinfo_endpoint)
            .header(AUTHORIZATION, token.bearer())
            .send()
            .await
            .map_err(|e| TextDriveError::transport(NO_STATUS_CODE, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TextDriveError::remote_api(
                status.as_u16(),
                status.canonical_reason().unwrap_or("userinfo lookup failed"),
            ));
        }

        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| TextDriveError::transport(status.as_u16(), e.to_string()))?;
        Ok(info.id.or(info.sub).filter(|id| !id.is_empty()))
    }

    async fn invalidate(&self, token: &AccessToken) {
        let client_id = self
            .cache
            .lock()
            .await
            .as_ref()
            .map(|c| c.client_id.clone())
            .unwrap_or_else(|| self.config.client_id.clone());
        let mut creds = self.cached_credentials(&client_id).await;
        if !creds.forget_access_token(token.secret()) {
            return;
        }

        tracing::info!("[Auth] dropped rejected access token");
        if let Err(e) = self.credentials.save(&creds) {
            tracing::warn!("[Auth] failed to cache credentials: {}", e);
        }
        *self.cache.lock().await = Some(creds);
    }
}
