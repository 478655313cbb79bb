//! reqwest-backed execution of remote API requests.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use textdrive_core::auth::AccessToken;
use textdrive_core::error::NO_STATUS_CODE;
use textdrive_core::remote::{ApiRequest, DriveTransport, HttpMethod};
use textdrive_core::{Result, TextDriveError};

/// Error envelope of the provider: `{"error": {"code": 404, "message": "..."}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct HttpDriveTransport {
    client: Client,
    base_url: String,
}

impl HttpDriveTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, request: &ApiRequest) -> String {
        format!("{}{}", self.base_url, request.path)
    }
}

fn method_of(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Maps a failed response to a `RemoteApi` error, preferring the code and
/// message of the provider's error body.
fn api_error(status: StatusCode, body: &str) -> TextDriveError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error);
    let code = detail
        .as_ref()
        .and_then(|d| d.code)
        .unwrap_or(status.as_u16());
    let message = detail
        .and_then(|d| d.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });
    TextDriveError::remote_api(code, message)
}

fn transport_error(err: reqwest::Error) -> TextDriveError {
    let code = err.status().map_or(NO_STATUS_CODE, |s| s.as_u16());
    TextDriveError::transport(code, err.to_string())
}

fn decode_body(body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| {
        TextDriveError::transport(NO_STATUS_CODE, format!("Invalid response body: {e}"))
    })
}

#[async_trait]
impl DriveTransport for HttpDriveTransport {
    async fn execute(&self, token: &AccessToken, request: &ApiRequest) -> Result<Value> {
        let url = self.url_for(request);
        tracing::debug!("[Drive] {} {}", request.method.as_str(), url);

        let mut builder = self
            .client
            .request(method_of(request.method), &url)
            .header(AUTHORIZATION, token.bearer());
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(content_type) = request.content_type.as_deref() {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(body) = request.body.clone() {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            tracing::debug!("[Drive] {} {} failed with {}", request.method.as_str(), url, status);
            return Err(api_error(status, &body));
        }
        decode_body(&body)
    }

    async fn download(&self, token: &AccessToken, url: &str) -> Result<String> {
        tracing::debug!("[Drive] download {}", url);
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, token.bearer())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }
        response.text().await.map_err(transport_error)
    }
}
