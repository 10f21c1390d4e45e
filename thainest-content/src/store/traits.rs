//! The `ContentStore` trait: the seam between the synchronizer and the
//! remote content API.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreResult;
use crate::types::UploadForm;

/// Transport over the remote content API.
///
/// Paths are relative to the store's base URL (e.g. `aboutus-content`).
/// Any non-2xx answer is reported as [`StoreError::Server`] carrying the
/// response body untouched, so callers can surface it verbatim.
///
/// [`StoreError::Server`]: crate::error::StoreError::Server
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Get the backend identifier (base URL or a test label).
    fn id(&self) -> &str;

    /// Fetch a JSON document.
    async fn fetch(&self, path: &str) -> StoreResult<Value>;

    /// Post a JSON body and return the response text.
    async fn post_json(&self, path: &str, body: &Value) -> StoreResult<String>;

    /// Post a multipart form and return the response text.
    async fn post_multipart(&self, path: &str, form: UploadForm) -> StoreResult<String>;
}
