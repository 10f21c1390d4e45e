//! Shared types for the content client

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Content API used by the live site.
pub const DEFAULT_API_URL: &str = "https://bnadmin-production.up.railway.app";

/// Public asset root that the site serves images from.
pub const DEFAULT_ASSET_URL: &str = "https://raw.githubusercontent.com/PtrwTg/Thainest/main";

/// MIME type sent with every uploaded attachment.
pub const SVG_MIME: &str = "image/svg+xml";

/// Multipart field name the store expects the file under.
pub const FILE_FIELD: &str = "svgfile";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL for the content API
    pub base_url: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

/// A binary asset chosen for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read an attachment from disk, keeping only the file name.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.svg".to_string());
        Ok(Self { file_name, bytes })
    }

    /// An attachment with no content counts as no attachment.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A multipart request body: one file part plus scalar text fields.
#[derive(Debug, Clone)]
pub struct UploadForm {
    pub attachment: Attachment,
    pub fields: Vec<(String, String)>,
}

impl UploadForm {
    pub fn new(attachment: Attachment) -> Self {
        Self {
            attachment,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}
