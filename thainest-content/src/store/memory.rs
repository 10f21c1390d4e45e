//! In-memory content store for tests and offline runs.
//!
//! Emulates the remote store closely enough to exercise the whole
//! synchronizer: documents carry a `sha` that changes on every write and
//! stale tokens are rejected, list routes append and remove items, and
//! failures can be scripted for the next request.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;

use super::traits::ContentStore;
use crate::document::{set_pointer, TOKEN_FIELD};
use crate::error::{StoreError, StoreResult};
use crate::types::{UploadForm, FILE_FIELD};

/// Body of a recorded request.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedBody {
    Empty,
    Json(Value),
    Multipart {
        fields: Vec<(String, String)>,
        file_field: String,
        file_name: String,
    },
}

/// A request the store received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub body: RecordedBody,
}

#[derive(Debug, Clone)]
struct StoredDoc {
    value: Value,
    version: Option<u64>,
}

impl StoredDoc {
    fn sha(&self) -> Option<String> {
        self.version.map(|v| format!("v{v}"))
    }

    fn bump(&mut self) {
        if let Some(v) = self.version.as_mut() {
            *v += 1;
        }
    }
}

#[derive(Debug, Clone)]
struct ListRoute {
    prefix: String,
    document: String,
    pointer: String,
    image_field: String,
}

#[derive(Debug)]
enum Scripted {
    Reject { status: u16, message: String },
    Unavailable,
}

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<String, StoredDoc>,
    routes: Vec<ListRoute>,
    requests: Vec<RecordedRequest>,
    next_write: VecDeque<Scripted>,
    fetch_failures: usize,
}

/// In-memory [`ContentStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    write_delay: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a document guarded by a `sha` token (starting at `v1`).
    pub fn with_document(mut self, path: impl Into<String>, doc: Value) -> Self {
        self.inner.get_mut().documents.insert(
            path.into(),
            StoredDoc {
                value: doc,
                version: Some(1),
            },
        );
        self
    }

    /// Serve a document that has no token on the wire.
    pub fn with_untracked_document(mut self, path: impl Into<String>, doc: Value) -> Self {
        self.inner.get_mut().documents.insert(
            path.into(),
            StoredDoc {
                value: doc,
                version: None,
            },
        );
        self
    }

    /// Route `<prefix>/add`, `<prefix>/delete` and `<prefix>/update-<field>`
    /// to the list at `pointer` inside `document`.
    pub fn with_list_route(
        mut self,
        prefix: impl Into<String>,
        document: impl Into<String>,
        pointer: impl Into<String>,
        image_field: impl Into<String>,
    ) -> Self {
        self.inner.get_mut().routes.push(ListRoute {
            prefix: prefix.into(),
            document: document.into(),
            pointer: pointer.into(),
            image_field: image_field.into(),
        });
        self
    }

    /// Hold every write for `delay` before answering.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Answer the next write with a non-2xx status.
    pub async fn reject_next_write(&self, status: u16, message: impl Into<String>) {
        self.inner.lock().await.next_write.push_back(Scripted::Reject {
            status,
            message: message.into(),
        });
    }

    /// Fail the next write as if the network were down.
    pub async fn fail_next_write(&self) {
        self.inner
            .lock()
            .await
            .next_write
            .push_back(Scripted::Unavailable);
    }

    /// Fail the next fetch as if the network were down.
    pub async fn fail_next_fetch(&self) {
        self.inner.lock().await.fetch_failures += 1;
    }

    /// Current document content, without the token.
    pub async fn document(&self, path: &str) -> Option<Value> {
        self.inner
            .lock()
            .await
            .documents
            .get(path)
            .map(|d| d.value.clone())
    }

    /// Replace a document as another client would, moving its token on.
    pub async fn set_document(&self, path: &str, doc: Value) {
        let mut inner = self.inner.lock().await;
        if let Some(stored) = inner.documents.get_mut(path) {
            stored.value = doc;
            stored.bump();
        }
    }

    /// Current token of a document.
    pub async fn sha(&self, path: &str) -> Option<String> {
        self.inner
            .lock()
            .await
            .documents
            .get(path)
            .and_then(StoredDoc::sha)
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().await.requests.clone()
    }

    /// Number of requests received for `method` and `path`.
    pub async fn count(&self, method: &str, path: &str) -> usize {
        self.inner
            .lock()
            .await
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    async fn begin_write(&self, request: RecordedRequest) -> StoreResult<()> {
        let scripted = {
            let mut inner = self.inner.lock().await;
            inner.requests.push(request);
            inner.next_write.pop_front()
        };

        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        match scripted {
            Some(Scripted::Reject { status, message }) => Err(StoreError::Server { status, message }),
            Some(Scripted::Unavailable) => Err(StoreError::Unavailable("scripted failure".into())),
            None => Ok(()),
        }
    }
}

fn check_token(doc: &StoredDoc, presented: Option<&str>) -> StoreResult<()> {
    match doc.sha() {
        Some(current) if presented != Some(current.as_str()) => Err(StoreError::Server {
            status: 409,
            message: "sha mismatch: document has changed".into(),
        }),
        _ => Ok(()),
    }
}

fn not_found(path: &str) -> StoreError {
    StoreError::Server {
        status: 404,
        message: format!("Cannot POST /{path}"),
    }
}

fn list_mut<'a>(doc: &'a mut Value, pointer: &str) -> Option<&'a mut Vec<Value>> {
    if doc.pointer(pointer).and_then(Value::as_array).is_none() {
        set_pointer(doc, pointer, Value::Array(Vec::new()));
    }
    doc.pointer_mut(pointer).and_then(Value::as_array_mut)
}

// Strip the token and, for `{ "<envelope>": {...} }` bodies, unwrap the envelope.
fn unwrap_body(body: &Value, current: &Value) -> Value {
    let mut map = body.as_object().cloned().unwrap_or_default();
    map.remove(TOKEN_FIELD);

    if map.len() == 1 {
        if let Some((key, inner)) = map.iter().next() {
            if inner.is_object() && current.get(key).is_none() {
                return inner.clone();
            }
        }
    }
    Value::Object(map)
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn id(&self) -> &str {
        "memory"
    }

    async fn fetch(&self, path: &str) -> StoreResult<Value> {
        let mut inner = self.inner.lock().await;
        inner.requests.push(RecordedRequest {
            method: "GET",
            path: path.to_string(),
            body: RecordedBody::Empty,
        });

        if inner.fetch_failures > 0 {
            inner.fetch_failures -= 1;
            return Err(StoreError::Unavailable("scripted failure".into()));
        }

        let stored = inner.documents.get(path).ok_or_else(|| StoreError::Server {
            status: 404,
            message: format!("Cannot GET /{path}"),
        })?;

        let mut doc = stored.value.clone();
        if let (Some(sha), Value::Object(map)) = (stored.sha(), &mut doc) {
            map.insert(TOKEN_FIELD.to_string(), Value::String(sha));
        }
        Ok(doc)
    }

    async fn post_json(&self, path: &str, body: &Value) -> StoreResult<String> {
        self.begin_write(RecordedRequest {
            method: "POST",
            path: path.to_string(),
            body: RecordedBody::Json(body.clone()),
        })
        .await?;

        let presented = body.get(TOKEN_FIELD).and_then(Value::as_str);
        let mut inner = self.inner.lock().await;

        if let Some(stored) = inner.documents.get_mut(path) {
            check_token(stored, presented)?;
            stored.value = unwrap_body(body, &stored.value);
            stored.bump();
            return Ok("Saved".into());
        }

        let Some(route) = inner
            .routes
            .iter()
            .find(|r| path.starts_with(&format!("{}/", r.prefix)))
            .cloned()
        else {
            return Err(not_found(path));
        };
        let action = &path[route.prefix.len() + 1..];

        let stored = inner
            .documents
            .get_mut(&route.document)
            .ok_or_else(|| not_found(path))?;
        check_token(stored, presented)?;

        let index = body
            .get("index")
            .and_then(Value::as_u64)
            .map(|i| i as usize)
            .ok_or_else(|| StoreError::Server {
                status: 400,
                message: "index is required".into(),
            })?;
        let out_of_range = || StoreError::Server {
            status: 400,
            message: format!("index {index} out of range"),
        };
        let items = list_mut(&mut stored.value, &route.pointer).ok_or_else(out_of_range)?;

        let reply = if action == "delete" {
            if index >= items.len() {
                return Err(out_of_range());
            }
            items.remove(index);
            "Deleted"
        } else if let Some(field) = action.strip_prefix("update-") {
            let item = items
                .get_mut(index)
                .and_then(Value::as_object_mut)
                .ok_or_else(out_of_range)?;
            let value = body.get(field).cloned().unwrap_or(Value::Null);
            item.insert(field.to_string(), value);
            "Updated"
        } else {
            return Err(not_found(path));
        };

        stored.bump();
        Ok(reply.into())
    }

    async fn post_multipart(&self, path: &str, form: UploadForm) -> StoreResult<String> {
        self.begin_write(RecordedRequest {
            method: "POST",
            path: path.to_string(),
            body: RecordedBody::Multipart {
                fields: form.fields.clone(),
                file_field: FILE_FIELD.to_string(),
                file_name: form.attachment.file_name.clone(),
            },
        })
        .await?;

        let mut inner = self.inner.lock().await;
        let route = inner
            .routes
            .iter()
            .find(|r| path == format!("{}/add", r.prefix))
            .cloned();

        // Unrouted uploads are plain asset writes.
        let Some(route) = route else {
            return Ok("Uploaded".into());
        };

        let stored = inner
            .documents
            .get_mut(&route.document)
            .ok_or_else(|| not_found(path))?;
        check_token(stored, form.field(TOKEN_FIELD))?;

        let mut item: Map<String, Value> = form
            .fields
            .iter()
            .filter(|(k, _)| k != TOKEN_FIELD)
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        item.insert(
            route.image_field.clone(),
            Value::String(form.attachment.file_name.clone()),
        );

        if let Some(items) = list_mut(&mut stored.value, &route.pointer) {
            items.push(Value::Object(item));
        }
        stored.bump();
        Ok("Added".into())
    }
}
