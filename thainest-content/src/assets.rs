//! Public asset URLs
//!
//! Images are not served through the content API; they live under a fixed
//! public root and are addressed by file name. Every rendered URL carries a
//! millisecond query so a freshly uploaded file replaces the cached one.

use chrono::Utc;

use crate::types::DEFAULT_ASSET_URL;

#[derive(Debug, Clone)]
pub struct AssetUrls {
    base_url: String,
}

impl Default for AssetUrls {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_URL)
    }
}

impl AssetUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of `file` under `dir`. Any directory prefix on `file` is dropped.
    pub fn resolve(&self, dir: &str, file: &str) -> String {
        let name = file.rsplit(['/', '\\']).next().unwrap_or(file);
        format!(
            "{}/{}/{}",
            self.base_url,
            dir.trim_matches('/'),
            urlencoding::encode(name)
        )
    }

    /// [`resolve`](Self::resolve) plus a cache-busting query.
    pub fn cache_busted(&self, dir: &str, file: &str) -> String {
        format!("{}?{}", self.resolve(dir, file), Utc::now().timestamp_millis())
    }
}
