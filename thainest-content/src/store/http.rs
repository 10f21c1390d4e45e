//! HTTP client for the content API

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::traits::ContentStore;
use crate::error::{StoreError, StoreResult};
use crate::types::{StoreConfig, UploadForm, FILE_FIELD, SVG_MIME};

/// HTTP client for the content API
///
/// # Example
///
/// ```rust,no_run
/// use thainest_content::{ContentStore, HttpStore, StoreConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = HttpStore::new(StoreConfig {
///     base_url: "http://localhost:8080".into(),
///     ..Default::default()
/// })?;
///
/// let contact = store.fetch("contact-config").await?;
/// println!("sha = {}", contact["sha"]);
/// # Ok(())
/// # }
/// ```
pub struct HttpStore {
    config: StoreConfig,
    client: Client,
}

impl HttpStore {
    /// Create a new store client
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Get the store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn read_text(response: Response) -> StoreResult<String> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(StoreError::Server {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl ContentStore for HttpStore {
    fn id(&self) -> &str {
        &self.config.base_url
    }

    async fn fetch(&self, path: &str) -> StoreResult<Value> {
        let url = self.url(path);
        debug!(%url, "GET");

        let response = self.client.get(&url).send().await?;
        let body = Self::read_text(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn post_json(&self, path: &str, body: &Value) -> StoreResult<String> {
        let url = self.url(path);
        debug!(%url, "POST json");

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;

        Self::read_text(response).await
    }

    async fn post_multipart(&self, path: &str, form: UploadForm) -> StoreResult<String> {
        let url = self.url(path);
        debug!(%url, file = %form.attachment.file_name, "POST multipart");

        let part = Part::bytes(form.attachment.bytes)
            .file_name(form.attachment.file_name)
            .mime_str(SVG_MIME)?;

        let mut multipart = Form::new().part(FILE_FIELD, part);
        for (name, value) in form.fields {
            multipart = multipart.text(name, value);
        }

        let response = self.client.post(&url).multipart(multipart).send().await?;
        Self::read_text(response).await
    }
}
