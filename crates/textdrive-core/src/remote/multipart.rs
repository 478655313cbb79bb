//! Multipart bodies for single-request metadata + content uploads.
//!
//! Layout (CRLF line endings):
//!
//! ```text
//!
//! --BOUNDARY
//! Content-Type: application/json
//!
//! <JSON metadata>
//! --BOUNDARY
//! Content-Type: <mimeType>
//! [Content-Transfer-Encoding: base64]
//!
//! <content>
//! --BOUNDARY--
//! ```

use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::remote::request::{ContentEncoding, UploadContent};

const BOUNDARY_PREFIX: &str = "textdrive_";
const BOUNDARY_RANDOM_LEN: usize = 40;

/// An encoded multipart body together with its boundary token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    boundary: String,
    body: String,
}

impl MultipartBody {
    /// Encodes metadata and content under a fresh random boundary that occurs
    /// in neither part.
    pub fn encode(metadata_json: &str, mime_type: &str, content: &UploadContent) -> Self {
        loop {
            let boundary = random_boundary();
            if let Some(body) = Self::with_boundary(&boundary, metadata_json, mime_type, content) {
                return body;
            }
            tracing::debug!("[Multipart] boundary collided with body, regenerating");
        }
    }

    /// Encodes under `boundary`, or `None` when the boundary occurs in the
    /// metadata or the content.
    pub fn with_boundary(
        boundary: &str,
        metadata_json: &str,
        mime_type: &str,
        content: &UploadContent,
    ) -> Option<Self> {
        if boundary.is_empty()
            || metadata_json.contains(boundary)
            || content.data().contains(boundary)
        {
            return None;
        }

        let delimiter = format!("\r\n--{boundary}\r\n");
        let close_delimiter = format!("\r\n--{boundary}--");
        let transfer_encoding = match content.encoding() {
            ContentEncoding::Base64 => "Content-Transfer-Encoding: base64\r\n",
            ContentEncoding::Plain => "",
        };

        let mut body = String::with_capacity(
            metadata_json.len() + content.data().len() + 2 * delimiter.len() + 128,
        );
        body.push_str(&delimiter);
        body.push_str("Content-Type: application/json\r\n\r\n");
        body.push_str(metadata_json);
        body.push_str(&delimiter);
        body.push_str("Content-Type: ");
        body.push_str(mime_type);
        body.push_str("\r\n");
        body.push_str(transfer_encoding);
        body.push_str("\r\n");
        body.push_str(content.data());
        body.push_str(&close_delimiter);

        Some(Self {
            boundary: boundary.to_string(),
            body,
        })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// `Content-Type` header value of the request carrying this body.
    pub fn content_type(&self) -> String {
        format!("multipart/mixed; boundary=\"{}\"", self.boundary)
    }

    pub fn as_str(&self) -> &str {
        &self.body
    }

    pub fn into_string(self) -> String {
        self.body
    }
}

fn random_boundary() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BOUNDARY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{BOUNDARY_PREFIX}{token}")
}
