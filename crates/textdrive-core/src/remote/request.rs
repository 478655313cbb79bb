//! Request descriptions for the remote files API.
//!
//! Builders here decide method, path, query and body for every call; the
//! transport only executes them.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};

use crate::error::{Result, TextDriveError};
use crate::remote::model::RemoteFile;
use crate::remote::multipart::MultipartBody;

/// MIME type of documents created by the editor.
pub const DEFAULT_MIME_TYPE: &str = "text/plain";
/// Metadata endpoint of the files collection.
pub const FILES_PATH: &str = "/drive/v2/files";
/// Prefix of the media upload endpoint.
pub const UPLOAD_PREFIX: &str = "/upload";

const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Plain,
    /// Data is already base64 text; the part is flagged accordingly.
    Base64,
}

/// File content attached to an insert or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadContent {
    data: String,
    encoding: ContentEncoding,
}

impl UploadContent {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            data: text.into(),
            encoding: ContentEncoding::Plain,
        }
    }

    /// Wraps text that is already base64 encoded.
    pub fn base64_encoded(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            encoding: ContentEncoding::Base64,
        }
    }

    /// Encodes raw bytes as base64.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::base64_encoded(STANDARD.encode(bytes))
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn encoding(&self) -> ContentEncoding {
        self.encoding
    }
}

/// A fully described API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub body: Option<String>,
}

impl ApiRequest {
    fn new(method: HttpMethod, path: String) -> Self {
        Self {
            method,
            path,
            params: Vec::new(),
            content_type: None,
            body: None,
        }
    }

    pub fn list() -> Self {
        Self::new(HttpMethod::Get, FILES_PATH.to_string())
    }

    pub fn get(id: &str) -> Result<Self> {
        Ok(Self::new(HttpMethod::Get, file_path(id)?))
    }

    pub fn delete(id: &str) -> Result<Self> {
        Ok(Self::new(HttpMethod::Delete, file_path(id)?))
    }

    /// Creates a file from `metadata`. With content the request goes to the
    /// upload endpoint as a multipart body.
    pub fn insert(metadata: Map<String, Value>, content: Option<&UploadContent>) -> Result<Self> {
        let mime_type = metadata
            .get("mimeType")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string();
        let metadata_json = serde_json::to_string(&metadata)?;
        Ok(Self::with_body(
            HttpMethod::Post,
            FILES_PATH.to_string(),
            metadata_json,
            &mime_type,
            content,
        ))
    }

    /// Replaces the metadata (and optionally the content) of `file`.
    pub fn update(file: &RemoteFile, content: Option<&UploadContent>) -> Result<Self> {
        let path = file_path(&file.id)?;
        let metadata_json = serde_json::to_string(file)?;
        let mime_type = if file.mime_type.is_empty() {
            DEFAULT_MIME_TYPE
        } else {
            file.mime_type.as_str()
        };
        Ok(Self::with_body(
            HttpMethod::Put,
            path,
            metadata_json,
            mime_type,
            content,
        ))
    }

    fn with_body(
        method: HttpMethod,
        path: String,
        metadata_json: String,
        mime_type: &str,
        content: Option<&UploadContent>,
    ) -> Self {
        match content {
            Some(content) => {
                let multipart = MultipartBody::encode(&metadata_json, mime_type, content);
                let mut request = Self::new(method, format!("{UPLOAD_PREFIX}{path}"));
                request
                    .params
                    .push(("uploadType".to_string(), "multipart".to_string()));
                request.content_type = Some(multipart.content_type());
                request.body = Some(multipart.into_string());
                request
            }
            None => {
                let mut request = Self::new(method, path);
                request.content_type = Some(JSON_CONTENT_TYPE.to_string());
                request.body = Some(metadata_json);
                request
            }
        }
    }

    /// Whether this request uploads file content.
    pub fn is_upload(&self) -> bool {
        self.path.starts_with(UPLOAD_PREFIX)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn file_path(id: &str) -> Result<String> {
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(TextDriveError::remote_api(
            400,
            format!("Invalid file id: '{id}'"),
        ));
    }
    Ok(format!("{FILES_PATH}/{id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(title: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("title".to_string(), json!(title));
        map.insert("mimeType".to_string(), json!(DEFAULT_MIME_TYPE));
        map
    }

    #[test]
    fn test_insert_with_content_uses_upload_endpoint() {
        let content = UploadContent::plain("hello");
        let request = ApiRequest::insert(metadata("notes.txt"), Some(&content)).unwrap();

        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.path, "/upload/drive/v2/files");
        assert_eq!(request.param("uploadType"), Some("multipart"));
        assert!(request.is_upload());

        let content_type = request.content_type.as_deref().unwrap();
        assert!(content_type.starts_with("multipart/mixed; boundary=\""));
        let body = request.body.as_deref().unwrap();
        assert!(body.contains("\"title\":\"notes.txt\""));
        assert!(body.contains("Content-Type: text/plain\r\n\r\nhello\r\n--"));
    }

    #[test]
    fn test_insert_without_content_sends_metadata_only() {
        let request = ApiRequest::insert(metadata("empty.txt"), None).unwrap();

        assert_eq!(request.path, FILES_PATH);
        assert!(request.params.is_empty());
        assert_eq!(request.content_type.as_deref(), Some("application/json"));
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["title"], "empty.txt");
    }

    #[test]
    fn test_update_keeps_unknown_metadata() {
        let file: RemoteFile = serde_json::from_value(json!({
            "id": "f1",
            "title": "a.md",
            "mimeType": "text/markdown",
            "etag": "\"e\""
        }))
        .unwrap();

        let request = ApiRequest::update(&file, Some(&UploadContent::plain("# hi"))).unwrap();

        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(request.path, "/upload/drive/v2/files/f1");
        let body = request.body.as_deref().unwrap();
        assert!(body.contains("\"etag\""));
        assert!(body.contains("Content-Type: text/markdown\r\n\r\n# hi"));
    }

    #[test]
    fn test_invalid_ids_are_rejected() {
        let err = ApiRequest::get("").unwrap_err();
        assert_eq!(err.code(), 400);
        assert!(ApiRequest::delete("a/b").is_err());
        assert_eq!(ApiRequest::get("abc").unwrap().path, "/drive/v2/files/abc");
    }

    #[test]
    fn test_from_bytes_encodes_base64() {
        let content = UploadContent::from_bytes(b"hello");
        assert_eq!(content.data(), "aGVsbG8=");
        assert_eq!(content.encoding(), ContentEncoding::Base64);
    }
}
