//! Remote file domain models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A file resource of the remote provider.
///
/// Fields are populated progressively: listing and metadata fetches fill the
/// metadata, `download_url` is present after a full fetch, and `content` only
/// after an explicit content download. Provider fields without a dedicated
/// member are kept in `extra` so an update sends them back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Provider-assigned identifier. Never generated locally.
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Downloaded text. Never part of the metadata sent to the provider.
    #[serde(skip)]
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RemoteFile {
    /// Filename extension: the provider's explicit field, else the suffix of
    /// the title after the last dot.
    pub fn extension(&self) -> Option<String> {
        if let Some(ext) = self.file_extension.as_deref().filter(|e| !e.is_empty()) {
            return Some(ext.to_string());
        }
        extension_from_title(&self.title)
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

fn extension_from_title(title: &str) -> Option<String> {
    let (_, suffix) = title.rsplit_once('.')?;
    if suffix.is_empty() || suffix.contains(['/', '\\']) {
        return None;
    }
    Some(suffix.to_string())
}

/// Response of a list call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileList {
    #[serde(default)]
    pub items: Vec<RemoteFile>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extension_prefers_provider_field() {
        let file = RemoteFile {
            title: "notes.txt".to_string(),
            file_extension: Some("md".to_string()),
            ..Default::default()
        };
        assert_eq!(file.extension().as_deref(), Some("md"));
    }

    #[test]
    fn test_extension_from_title() {
        let mut file = RemoteFile {
            title: "archive.tar.gz".to_string(),
            ..Default::default()
        };
        assert_eq!(file.extension().as_deref(), Some("gz"));

        file.title = "Loading...".to_string();
        assert_eq!(file.extension(), None);

        file.title = "dir.d/README".to_string();
        assert_eq!(file.extension(), None);

        file.title = "README".to_string();
        assert_eq!(file.extension(), None);
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let raw = json!({
            "id": "abc",
            "title": "notes.txt",
            "mimeType": "text/plain",
            "downloadUrl": "https://example.test/abc",
            "labels": {"starred": true},
            "etag": "\"e1\""
        });
        let file: RemoteFile = serde_json::from_value(raw).unwrap();
        assert_eq!(file.download_url.as_deref(), Some("https://example.test/abc"));
        assert_eq!(file.extra.get("etag"), Some(&json!("\"e1\"")));

        let back = serde_json::to_value(&file.with_content("ignored")).unwrap();
        assert_eq!(back["labels"], json!({"starred": true}));
        assert!(back.get("content").is_none());
    }
}
