//! Section synchronizer
//!
//! One [`SectionSynchronizer`] per content section. It keeps the local
//! editable state, loads it from the store, and sends saves, list
//! operations and asset uploads. Every operation reports its lifecycle on
//! the shared [`StatusBoard`] and every write goes through the per-section
//! [`WriteGate`]. After a successful write the section is re-fetched once so
//! local state and token follow the store.

use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::assets::AssetUrls;
use crate::confirm::Confirm;
use crate::document::{Row, RowId, SectionState, TOKEN_FIELD};
use crate::error::{Precondition, Result, SyncError};
use crate::gate::WriteGate;
use crate::messages::Messages;
use crate::schema::{AssetSlot, ListSpec, RemoteListOps, SectionSchema};
use crate::status::StatusBoard;
use crate::store::ContentStore;
use crate::types::{Attachment, UploadForm};

/// Services shared by every synchronizer of a console.
#[derive(Clone)]
pub struct SyncContext {
    pub store: Arc<dyn ContentStore>,
    pub status: StatusBoard,
    pub gate: WriteGate,
    pub messages: Messages,
    pub assets: AssetUrls,
}

impl SyncContext {
    /// Context with default status, gate, messages and asset settings.
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            status: StatusBoard::default(),
            gate: WriteGate::default(),
            messages: Messages::default(),
            assets: AssetUrls::default(),
        }
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("store", &self.store.id())
            .field("gate", &self.gate)
            .field("locale", &self.messages.locale())
            .finish()
    }
}

/// Form input for adding an item to a store-managed list.
#[derive(Debug, Clone, Default)]
pub struct ItemDraft {
    pub fields: HashMap<String, String>,
    pub attachment: Option<Attachment>,
}

impl ItemDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Field value, empty when unset.
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }

    /// Reset the form after a successful submit.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.attachment = None;
    }

    pub fn is_empty(&self) -> bool {
        self.fields.values().all(|v| v.is_empty()) && self.attachment.is_none()
    }
}

/// Result of a delete request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The store removed the item; carries its reply.
    Deleted(String),
    /// The operator declined; nothing was sent.
    Declined,
}

/// Local state and remote operations for one section.
pub struct SectionSynchronizer {
    schema: &'static SectionSchema,
    ctx: SyncContext,
    state: RwLock<SectionState>,
}

impl SectionSynchronizer {
    pub fn new(schema: &'static SectionSchema, ctx: SyncContext) -> Self {
        Self {
            schema,
            ctx,
            state: RwLock::new(SectionState::default()),
        }
    }

    pub fn schema(&self) -> &'static SectionSchema {
        self.schema
    }

    /// Section key, also the status key for loads and saves.
    pub fn key(&self) -> &'static str {
        self.schema.key
    }

    pub fn status(&self) -> &StatusBoard {
        &self.ctx.status
    }

    /// Copy of the current local state.
    pub async fn state(&self) -> SectionState {
        self.state.read().await.clone()
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.is_loaded()
    }

    /// Token captured on the last successful load.
    pub async fn token(&self) -> Option<String> {
        self.state.read().await.token().map(String::from)
    }

    // ---- local editing ----

    pub async fn field(&self, name: &str) -> Result<String> {
        self.field_spec(name)?;
        Ok(self
            .state
            .read()
            .await
            .field(name)
            .unwrap_or_default()
            .to_string())
    }

    /// Edit a scalar field. Line fields take newline-separated text.
    pub async fn set_field(&self, name: &str, value: impl Into<String>) -> Result<()> {
        self.field_spec(name)?;
        self.state.write().await.set_field(name, value.into());
        Ok(())
    }

    pub async fn rows(&self, list: &str) -> Result<Vec<Row>> {
        self.list_spec(list)?;
        Ok(self.state.read().await.rows(list).to_vec())
    }

    pub async fn index_of(&self, list: &str, row: RowId) -> Option<usize> {
        self.state.read().await.index_of(list, row)
    }

    /// Append a row from the list's template. Saved with the document.
    pub async fn add_row(&self, list: &str) -> Result<RowId> {
        let spec = self.list_spec(list)?;
        let template = spec
            .new_row
            .filter(|_| spec.is_local())
            .ok_or_else(|| self.unsupported("add_row"))?;

        let mut state = self.state.write().await;
        let rows = state.rows_mut(list);
        let row = Row::new(template(rows.len()));
        let id = row.id;
        rows.push(row);
        debug!(section = self.key(), list, row = %id, "Row added locally");
        Ok(id)
    }

    /// Drop a row from a local list. Saved with the document.
    pub async fn remove_row(&self, list: &str, row: RowId) -> Result<()> {
        let spec = self.list_spec(list)?;
        if !spec.is_local() {
            return Err(self.unsupported("remove_row"));
        }

        let mut state = self.state.write().await;
        let index = state
            .index_of(list, row)
            .ok_or_else(|| Precondition::UnknownRow {
                list: list.to_string(),
                row,
            })?;
        state.rows_mut(list).remove(index);
        Ok(())
    }

    /// Edit one field of a row, addressed by its local id.
    pub async fn set_row_field(
        &self,
        list: &str,
        row: RowId,
        field: &str,
        value: impl Into<String>,
    ) -> Result<()> {
        let spec = self.list_spec(list)?;
        if !spec.item_fields.iter().any(|f| *f == field) {
            return Err(Precondition::UnknownField {
                section: self.key().to_string(),
                field: format!("{list}.{field}"),
            }
            .into());
        }

        let mut state = self.state.write().await;
        let target = state
            .rows_mut(list)
            .iter_mut()
            .find(|r| r.id == row)
            .ok_or_else(|| Precondition::UnknownRow {
                list: list.to_string(),
                row,
            })?;
        target.set(field, value);
        Ok(())
    }

    // ---- remote operations ----

    /// Fetch the section and replace local state.
    ///
    /// On failure local state is left as it was.
    pub async fn load(&self) -> Result<()> {
        let key = self.key();
        let messages = self.ctx.messages;
        self.ctx.status.loading(key, messages.loading());

        match self.ctx.store.fetch(self.schema.path).await {
            Ok(doc) => {
                *self.state.write().await = SectionState::from_document(self.schema, &doc);
                debug!(section = key, "Section loaded");
                self.ctx.status.success(key, messages.loaded());
                Ok(())
            }
            Err(e) => {
                warn!(section = key, error = %e, "Failed to load section");
                self.ctx.status.error(key, messages.load_failed());
                Err(e.into())
            }
        }
    }

    /// Write the whole document back, then reload it.
    pub async fn save(&self) -> Result<String> {
        let key = self.key();
        self.save_inner()
            .await
            .map_err(|e| self.fail(key, e, self.ctx.messages.save_failed()))
    }

    async fn save_inner(&self) -> Result<String> {
        let key = self.key();
        let envelope = self
            .schema
            .envelope
            .ok_or_else(|| self.unsupported("save"))?;
        // The document is taken as it stands when the save is requested. A
        // queued save only swaps in the token left by the write before it.
        let (token, mut body) = {
            let state = self.state.read().await;
            (self.check_token(&state)?, state.write_body(self.schema, envelope))
        };

        self.ctx.status.loading(key, self.ctx.messages.saving());
        let _permit = self.ctx.gate.acquire(key).await?;

        let token = self.current_token(token).await?;
        if let (Some(token), Value::Object(map)) = (token, &mut body) {
            map.insert(TOKEN_FIELD.into(), Value::String(token));
        }

        let reply = self.ctx.store.post_json(self.schema.path, &body).await?;
        info!(section = key, "Section saved");
        self.settle(key, &reply).await;
        Ok(reply)
    }

    /// Upload a new item to a store-managed list.
    ///
    /// The draft is cleared only when the store accepts it.
    pub async fn add_list_item(&self, list: &str, draft: &mut ItemDraft) -> Result<String> {
        let spec = self.list_spec(list)?;
        let remote = self.remote_ops(spec, "add")?;
        let key = remote.add_status_key;

        match self.add_inner(spec, remote, draft).await {
            Ok(reply) => {
                draft.clear();
                Ok(reply)
            }
            Err(e) => Err(self.fail(key, e, self.ctx.messages.add_failed(spec.label))),
        }
    }

    async fn add_inner(
        &self,
        spec: &ListSpec,
        remote: RemoteListOps,
        draft: &ItemDraft,
    ) -> Result<String> {
        let key = remote.add_status_key;
        let token = self.require_token().await?;

        if let Some(missing) = remote
            .required_fields
            .iter()
            .find(|f| draft.field(f).trim().is_empty())
        {
            return Err(Precondition::MissingField((*missing).to_string()).into());
        }
        let attachment = draft
            .attachment
            .as_ref()
            .filter(|a| !a.is_empty())
            .ok_or(Precondition::MissingAttachment)?;

        self.ctx.status.loading(key, self.ctx.messages.adding(spec.label));
        let _permit = self.ctx.gate.acquire(self.key()).await?;

        let mut form = UploadForm::new(attachment.clone());
        for name in remote.add_fields {
            form = form.with_field(*name, draft.field(name));
        }
        if let Some(token) = self.current_token(token).await? {
            form = form.with_field(TOKEN_FIELD, token);
        }

        let reply = self.ctx.store.post_multipart(remote.add_path, form).await?;
        info!(section = self.key(), list = spec.name, file = %attachment.file_name, "List item added");
        self.settle(key, &reply).await;
        Ok(reply)
    }

    /// Ask the store to delete the item at `index`.
    ///
    /// Needs the operator's confirmation; a declined prompt sends nothing.
    /// The row stays in local state until the reload drops it.
    pub async fn delete_list_item(
        &self,
        list: &str,
        index: usize,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome> {
        let spec = self.list_spec(list)?;
        let remote = self.remote_ops(spec, "delete")?;
        let key = spec.row_status.key_for(index);

        self.delete_inner(spec, remote, &key, index, confirm)
            .await
            .map_err(|e| self.fail(&key, e, self.ctx.messages.delete_failed(spec.label)))
    }

    /// [`delete_list_item`](Self::delete_list_item) for a row addressed by id.
    pub async fn delete_row(
        &self,
        list: &str,
        row: RowId,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome> {
        let index = self
            .index_of(list, row)
            .await
            .ok_or_else(|| Precondition::UnknownRow {
                list: list.to_string(),
                row,
            })?;
        self.delete_list_item(list, index, confirm).await
    }

    async fn delete_inner(
        &self,
        spec: &ListSpec,
        remote: RemoteListOps,
        key: &str,
        index: usize,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome> {
        let token = self.require_token().await?;
        self.check_index(spec, index).await?;

        if !confirm.confirm(&self.ctx.messages.confirm_delete(spec.label)) {
            debug!(section = self.key(), list = spec.name, index, "Delete declined");
            return Ok(DeleteOutcome::Declined);
        }

        self.ctx.status.loading(key, self.ctx.messages.deleting());
        let _permit = self.ctx.gate.acquire(self.key()).await?;

        let mut body = Map::new();
        body.insert("index".into(), json!(index));
        if let Some(token) = self.current_token(token).await? {
            body.insert(TOKEN_FIELD.into(), Value::String(token));
        }

        let reply = self
            .ctx
            .store
            .post_json(remote.delete_path, &Value::Object(body))
            .await?;
        info!(section = self.key(), list = spec.name, index, "List item deleted");
        self.settle(key, &reply).await;
        Ok(DeleteOutcome::Deleted(reply))
    }

    /// Send the row's current value of the list's update field.
    pub async fn update_list_item(&self, list: &str, index: usize) -> Result<String> {
        let spec = self.list_spec(list)?;
        let key = spec.row_status.key_for(index);

        self.update_inner(spec, &key, index)
            .await
            .map_err(|e| self.fail(&key, e, self.ctx.messages.update_failed()))
    }

    async fn update_inner(&self, spec: &ListSpec, key: &str, index: usize) -> Result<String> {
        let route = self
            .remote_ops(spec, "update")?
            .update
            .ok_or_else(|| self.unsupported("update"))?;
        let token = self.require_token().await?;

        // Read before queueing; a reload by an earlier write would reset it.
        let value = {
            let state = self.state.read().await;
            let row = state
                .rows(spec.name)
                .get(index)
                .ok_or_else(|| Precondition::IndexOutOfRange {
                    list: spec.name.to_string(),
                    index,
                })?;
            row.get(route.field).to_string()
        };

        self.ctx.status.loading(key, self.ctx.messages.updating());
        let _permit = self.ctx.gate.acquire(self.key()).await?;

        let mut body = Map::new();
        body.insert("index".into(), json!(index));
        body.insert(route.field.into(), Value::String(value));
        if let Some(token) = self.current_token(token).await? {
            body.insert(TOKEN_FIELD.into(), Value::String(token));
        }

        let reply = self
            .ctx
            .store
            .post_json(route.path, &Value::Object(body))
            .await?;
        info!(section = self.key(), list = spec.name, index, "List item updated");
        self.settle(key, &reply).await;
        Ok(reply)
    }

    /// Replace the image behind an asset slot.
    pub async fn upload_asset(
        &self,
        slot: &str,
        index: usize,
        attachment: Attachment,
    ) -> Result<String> {
        let key = self.key();
        self.upload_inner(slot, index, attachment)
            .await
            .map_err(|e| self.fail(key, e, self.ctx.messages.upload_failed()))
    }

    async fn upload_inner(&self, slot: &str, index: usize, attachment: Attachment) -> Result<String> {
        let key = self.key();
        let spec = self.asset_slot(slot)?;
        let path = self
            .schema
            .asset_upload_path
            .ok_or_else(|| self.unsupported("upload"))?;
        if attachment.is_empty() {
            return Err(Precondition::MissingAttachment.into());
        }

        let file_name = (spec.file_name)(index);
        self.ctx.status.loading(key, self.ctx.messages.uploading());
        let _permit = self.ctx.gate.acquire(key).await?;

        let form = UploadForm::new(attachment)
            .with_field("type", spec.upload_type)
            .with_field("filename", file_name.as_str());
        let reply = self.ctx.store.post_multipart(path, form).await?;
        info!(section = key, slot, file = %file_name, "Asset uploaded");

        self.ctx.status.success(key, self.reply_message(&reply));
        if spec.reload {
            self.refresh().await;
        }
        Ok(reply)
    }

    // ---- asset urls ----

    /// Public URL of an asset slot, fresh on every call.
    pub fn asset_url(&self, slot: &str, index: usize) -> Result<String> {
        let spec = self.asset_slot(slot)?;
        Ok(self
            .ctx
            .assets
            .cache_busted(spec.asset_dir, &(spec.file_name)(index)))
    }

    /// Public URL of a row's image, `None` when the list has no images or
    /// the row has no file name yet.
    pub async fn row_image_url(&self, list: &str, row: RowId) -> Result<Option<String>> {
        let spec = self.list_spec(list)?;
        let (Some(dir), Some(field)) = (spec.asset_dir, spec.image_field) else {
            return Ok(None);
        };

        let state = self.state.read().await;
        let row = state
            .rows(list)
            .iter()
            .find(|r| r.id == row)
            .ok_or_else(|| Precondition::UnknownRow {
                list: list.to_string(),
                row,
            })?;

        let file = row.get(field);
        Ok((!file.is_empty()).then(|| self.ctx.assets.cache_busted(dir, file)))
    }

    // ---- helpers ----

    fn field_spec(&self, name: &str) -> Result<()> {
        self.schema
            .field(name)
            .map(|_| ())
            .ok_or_else(|| {
                Precondition::UnknownField {
                    section: self.key().to_string(),
                    field: name.to_string(),
                }
                .into()
            })
    }

    fn list_spec(&self, list: &str) -> Result<&'static ListSpec> {
        self.schema.list(list).ok_or_else(|| {
            Precondition::UnknownList {
                section: self.key().to_string(),
                list: list.to_string(),
            }
            .into()
        })
    }

    fn asset_slot(&self, slot: &str) -> Result<&'static AssetSlot> {
        self.schema.asset(slot).ok_or_else(|| {
            Precondition::UnknownAsset {
                section: self.key().to_string(),
                slot: slot.to_string(),
            }
            .into()
        })
    }

    fn remote_ops(&self, spec: &ListSpec, operation: &'static str) -> Result<RemoteListOps> {
        spec.remote.ok_or_else(|| self.unsupported(operation))
    }

    fn unsupported(&self, operation: &'static str) -> SyncError {
        SyncError::Unsupported {
            section: self.key().to_string(),
            operation,
        }
    }

    /// Token for a write, `None` for untracked sections.
    async fn require_token(&self) -> Result<Option<String>> {
        let state = self.state.read().await;
        self.check_token(&state)
    }

    fn check_token(&self, state: &SectionState) -> Result<Option<String>> {
        if !self.schema.requires_token() {
            return Ok(None);
        }
        state
            .token()
            .map(|t| Some(t.to_string()))
            .ok_or_else(|| Precondition::MissingToken(self.key().to_string()).into())
    }

    // Re-read the token once the permit is held; a queued write may have
    // moved it on since the precondition check.
    async fn current_token(&self, checked: Option<String>) -> Result<Option<String>> {
        if checked.is_none() {
            return Ok(None);
        }
        self.require_token().await
    }

    async fn check_index(&self, spec: &ListSpec, index: usize) -> Result<()> {
        let len = self.state.read().await.rows(spec.name).len();
        if index >= len {
            return Err(Precondition::IndexOutOfRange {
                list: spec.name.to_string(),
                index,
            }
            .into());
        }
        Ok(())
    }

    fn reply_message(&self, reply: &str) -> String {
        let reply = reply.trim();
        if reply.is_empty() {
            self.ctx.messages.done()
        } else {
            reply.to_string()
        }
    }

    /// Report a successful write and pick up the store's new state.
    async fn settle(&self, key: &str, reply: &str) {
        self.ctx.status.success(key, self.reply_message(reply));
        self.refresh().await;
    }

    // The write's own status stays visible; only a failed re-fetch reports
    // on the section key.
    async fn refresh(&self) {
        match self.ctx.store.fetch(self.schema.path).await {
            Ok(doc) => {
                *self.state.write().await = SectionState::from_document(self.schema, &doc);
                debug!(section = self.key(), "Section reloaded");
            }
            Err(e) => {
                warn!(section = self.key(), error = %e, "Failed to reload section");
                self.ctx
                    .status
                    .error(self.key(), self.ctx.messages.load_failed());
            }
        }
    }

    fn fail(&self, key: &str, err: SyncError, fallback: String) -> SyncError {
        let messages = &self.ctx.messages;
        let message = match &err {
            SyncError::Precondition(p) => messages.precondition(p),
            SyncError::Rejected { message, .. } if !message.trim().is_empty() => message.clone(),
            SyncError::Busy(_) => messages.busy(),
            SyncError::Unsupported { .. } => err.to_string(),
            SyncError::Rejected { .. } | SyncError::Transport(_) => fallback,
        };

        warn!(section = self.key(), key, error = %err, "Operation failed");
        self.ctx.status.error(key, message);
        err
    }
}

impl std::fmt::Debug for SectionSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionSynchronizer")
            .field("section", &self.schema.key)
            .field("path", &self.schema.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::AutoConfirm;
    use crate::gate::WritePolicy;
    use crate::schema::{ABOUT_US, BLOG, CONTACT, SERVICES, SLIDES};
    use crate::status::StatusKind;
    use crate::store::{MemoryStore, RecordedBody};
    use std::time::Duration;

    fn contact_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new().with_document(
            "contact-config",
            json!({ "title": "A", "operationHours": [{ "day": "Mon", "time": "9-5" }] }),
        ))
    }

    fn synchronizer(schema: &'static SectionSchema, store: Arc<MemoryStore>) -> SectionSynchronizer {
        SectionSynchronizer::new(schema, SyncContext::new(store))
    }

    fn svg(name: &str) -> Attachment {
        Attachment::new(name, "<svg xmlns=\"http://www.w3.org/2000/svg\"/>")
    }

    #[tokio::test]
    async fn test_save_sends_edit_with_token_and_reloads() {
        let store = contact_store();
        let sync = synchronizer(&CONTACT, store.clone());

        sync.load().await.unwrap();
        assert_eq!(sync.field("title").await.unwrap(), "A");
        assert_eq!(sync.token().await.as_deref(), Some("v1"));

        sync.set_field("title", "B").await.unwrap();
        let reply = sync.save().await.unwrap();
        assert_eq!(reply, "Saved");

        let requests = store.requests().await;
        let methods: Vec<_> = requests.iter().map(|r| r.method).collect();
        assert_eq!(methods, ["GET", "POST", "GET"]);
        match &requests[1].body {
            RecordedBody::Json(body) => {
                assert_eq!(body["contactConfig"]["title"], "B");
                assert_eq!(body["contactConfig"]["operationHours"][0]["day"], "Mon");
                assert_eq!(body["sha"], "v1");
            }
            other => panic!("unexpected body {other:?}"),
        }

        assert_eq!(sync.field("title").await.unwrap(), "B");
        assert_eq!(sync.token().await.as_deref(), Some("v2"));

        let status = sync.status().get("contact").unwrap();
        assert_eq!(status.kind, StatusKind::Success);
        assert_eq!(status.message, "Saved");
    }

    #[tokio::test]
    async fn test_save_before_load_sends_nothing() {
        let store = contact_store();
        let sync = synchronizer(&CONTACT, store.clone());

        let err = sync.save().await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Precondition(Precondition::MissingToken(_))
        ));
        assert!(store.requests().await.is_empty());

        let status = sync.status().get("contact").unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(status.message, "ไม่พบ sha ของไฟล์");
    }

    #[tokio::test]
    async fn test_rejected_save_shows_body_and_skips_reload() {
        let store = contact_store();
        let sync = synchronizer(&CONTACT, store.clone());
        sync.load().await.unwrap();

        store.reject_next_write(500, "disk full").await;
        let err = sync.save().await.unwrap_err();

        assert!(matches!(err, SyncError::Rejected { status: 500, .. }));
        assert_eq!(store.count("GET", "contact-config").await, 1);
        assert_eq!(sync.status().get("contact").unwrap().message, "disk full");
    }

    #[tokio::test]
    async fn test_transport_failure_uses_generic_message() {
        let store = contact_store();
        let sync = synchronizer(&CONTACT, store.clone());
        sync.load().await.unwrap();

        store.fail_next_write().await;
        let err = sync.save().await.unwrap_err();

        assert!(matches!(err, SyncError::Transport(_)));
        assert_eq!(
            sync.status().get("contact").unwrap().message,
            Messages::default().save_failed()
        );
    }

    #[tokio::test]
    async fn test_stale_token_rejection_is_verbatim() {
        let store = contact_store();
        let sync = synchronizer(&CONTACT, store.clone());
        sync.load().await.unwrap();

        // Another client writes first.
        store
            .set_document("contact-config", json!({ "title": "Elsewhere" }))
            .await;

        sync.set_field("title", "Mine").await.unwrap();
        let err = sync.save().await.unwrap_err();

        assert!(matches!(err, SyncError::Rejected { status: 409, .. }));
        assert_eq!(
            sync.status().get("contact").unwrap().message,
            "sha mismatch: document has changed"
        );
        assert_eq!(sync.field("title").await.unwrap(), "Mine");
    }

    #[tokio::test]
    async fn test_failed_load_keeps_local_state() {
        let store = contact_store();
        let sync = synchronizer(&CONTACT, store.clone());
        sync.load().await.unwrap();
        sync.set_field("title", "Draft").await.unwrap();

        store.fail_next_fetch().await;
        assert!(sync.load().await.is_err());

        assert_eq!(sync.field("title").await.unwrap(), "Draft");
        assert_eq!(
            sync.status().get("contact").unwrap().message,
            Messages::default().load_failed()
        );
    }

    #[tokio::test]
    async fn test_unknown_field_is_a_precondition() {
        let sync = synchronizer(&CONTACT, contact_store());
        assert!(matches!(
            sync.set_field("nope", "x").await,
            Err(SyncError::Precondition(Precondition::UnknownField { .. }))
        ));
    }

    #[tokio::test]
    async fn test_add_without_file_fails_locally() {
        let store = Arc::new(
            MemoryStore::new()
                .with_document("aboutus-content", json!({ "serviceCards": [] }))
                .with_list_route("aboutus/service-card", "aboutus-content", "/serviceCards", "image"),
        );
        let sync = synchronizer(&ABOUT_US, store.clone());
        sync.load().await.unwrap();

        let mut draft = ItemDraft::new().with_field("alt", "Spa");
        let err = sync.add_list_item("serviceCards", &mut draft).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Precondition(Precondition::MissingAttachment)
        ));

        let mut empty = ItemDraft::new().with_attachment(Attachment::new("spa.svg", Vec::new()));
        assert!(sync.add_list_item("serviceCards", &mut empty).await.is_err());

        assert_eq!(store.count("POST", "aboutus/service-card/add").await, 0);
        assert_eq!(draft.field("alt"), "Spa");
        assert_eq!(
            sync.status().get("serviceCard").unwrap().message,
            "กรุณาเลือกไฟล์ SVG"
        );
    }

    #[tokio::test]
    async fn test_add_uploads_clears_draft_and_reloads() {
        let store = Arc::new(
            MemoryStore::new()
                .with_document("blogsection-config", json!({ "blogPosts": [] }))
                .with_list_route("blogsection/blogpost", "blogsection-config", "/blogPosts", "image"),
        );
        let sync = synchronizer(&BLOG, store.clone());
        sync.load().await.unwrap();

        let mut draft = ItemDraft::new()
            .with_field("title", "Rest")
            .with_field("alt", "Rest")
            .with_attachment(svg("rest.svg"));
        sync.add_list_item("blogPosts", &mut draft).await.unwrap();

        assert!(draft.is_empty());
        let rows = sync.rows("blogPosts").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("image"), "rest.svg");
        assert_eq!(rows[0].get("title"), "Rest");

        let add = store
            .requests()
            .await
            .into_iter()
            .find(|r| r.path == "blogsection/blogpost/add")
            .unwrap();
        match add.body {
            RecordedBody::Multipart {
                fields,
                file_field,
                file_name,
            } => {
                assert_eq!(file_field, "svgfile");
                assert_eq!(file_name, "rest.svg");
                assert!(fields.contains(&("sha".to_string(), "v1".to_string())));
                assert!(fields.contains(&("link".to_string(), String::new())));
            }
            other => panic!("unexpected body {other:?}"),
        }
        assert_eq!(
            sync.status().get("blogpost").unwrap().kind,
            StatusKind::Success
        );
    }

    fn slides_store() -> Arc<MemoryStore> {
        Arc::new(
            MemoryStore::new()
                .with_untracked_document(
                    "slides",
                    json!({ "slides": [
                        { "headline": "Relax", "image": "slide1.svg" },
                        { "headline": "Renew", "image": "slide2.svg" },
                    ] }),
                )
                .with_list_route("slides", "slides", "/slides", "image"),
        )
    }

    #[tokio::test]
    async fn test_slide_add_requires_headline() {
        let store = slides_store();
        let sync = synchronizer(&SLIDES, store.clone());
        sync.load().await.unwrap();

        let mut draft = ItemDraft::new().with_attachment(svg("slide3.svg"));
        let err = sync.add_list_item("slides", &mut draft).await.unwrap_err();

        assert!(matches!(
            err,
            SyncError::Precondition(Precondition::MissingField(ref f)) if f == "headline"
        ));
        assert_eq!(
            sync.status().get("addSlide").unwrap().message,
            "กรุณากรอกข้อมูลให้ครบถ้วน"
        );
    }

    #[tokio::test]
    async fn test_declined_delete_sends_nothing() {
        let store = slides_store();
        let sync = synchronizer(&SLIDES, store.clone());
        sync.load().await.unwrap();

        let outcome = sync
            .delete_list_item("slides", 1, &AutoConfirm(false))
            .await
            .unwrap();

        assert_eq!(outcome, DeleteOutcome::Declined);
        assert_eq!(store.count("POST", "slides/delete").await, 0);
        assert_eq!(sync.rows("slides").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_confirmed_delete_uses_row_key_and_reloads() {
        let store = slides_store();
        let sync = synchronizer(&SLIDES, store.clone());
        sync.load().await.unwrap();

        let second = sync.rows("slides").await.unwrap()[1].id;
        let prompts = std::sync::Mutex::new(Vec::new());
        let confirm = |prompt: &str| {
            prompts.lock().unwrap().push(prompt.to_string());
            true
        };
        let outcome = sync.delete_row("slides", second, &confirm).await.unwrap();

        assert!(matches!(outcome, DeleteOutcome::Deleted(_)));
        assert_eq!(prompts.lock().unwrap().len(), 1);

        let delete = store
            .requests()
            .await
            .into_iter()
            .find(|r| r.path == "slides/delete")
            .unwrap();
        assert_eq!(delete.body, RecordedBody::Json(json!({ "index": 1 })));

        let rows = sync.rows("slides").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("headline"), "Relax");
        assert_eq!(
            sync.status().get("slide-1").unwrap().kind,
            StatusKind::Success
        );
    }

    #[tokio::test]
    async fn test_delete_out_of_range_is_local() {
        let store = slides_store();
        let sync = synchronizer(&SLIDES, store.clone());
        sync.load().await.unwrap();

        let err = sync
            .delete_list_item("slides", 5, &AutoConfirm(true))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Precondition(Precondition::IndexOutOfRange { index: 5, .. })
        ));
        assert_eq!(store.count("POST", "slides/delete").await, 0);
    }

    #[tokio::test]
    async fn test_rejected_delete_keeps_rows_and_skips_reload() {
        let store = slides_store();
        let sync = synchronizer(&SLIDES, store.clone());
        sync.load().await.unwrap();
        let before = sync.rows("slides").await.unwrap();

        store.reject_next_write(500, "ลบสไลด์ไม่สำเร็จ").await;
        let err = sync
            .delete_list_item("slides", 1, &AutoConfirm(true))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Rejected { status: 500, .. }));
        let status = sync.status().get("slide-1").unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(status.message, "ลบสไลด์ไม่สำเร็จ");
        assert_eq!(sync.rows("slides").await.unwrap(), before);
        assert_eq!(store.count("GET", "slides").await, 1);
        assert_eq!(
            store.document("slides").await.unwrap()["slides"][1]["headline"],
            "Renew"
        );
    }

    #[tokio::test]
    async fn test_headline_update_sends_row_value() {
        let store = slides_store();
        let sync = synchronizer(&SLIDES, store.clone());
        sync.load().await.unwrap();

        let first = sync.rows("slides").await.unwrap()[0].id;
        sync.set_row_field("slides", first, "headline", "Breathe")
            .await
            .unwrap();
        sync.update_list_item("slides", 0).await.unwrap();

        let update = store
            .requests()
            .await
            .into_iter()
            .find(|r| r.path == "slides/update-headline")
            .unwrap();
        assert_eq!(
            update.body,
            RecordedBody::Json(json!({ "index": 0, "headline": "Breathe" }))
        );
        assert_eq!(sync.rows("slides").await.unwrap()[0].get("headline"), "Breathe");
        assert!(sync.status().get("slide-0").is_some());
    }

    #[tokio::test]
    async fn test_slides_have_no_document_save() {
        let sync = synchronizer(&SLIDES, slides_store());
        sync.load().await.unwrap();
        assert!(matches!(
            sync.save().await,
            Err(SyncError::Unsupported { operation: "save", .. })
        ));
    }

    #[tokio::test]
    async fn test_local_rows_are_saved_with_document() {
        let store = Arc::new(MemoryStore::new().with_document(
            "services-config",
            json!({ "hero": { "centerImages": [{ "src": "4img.svg" }] }, "massageServices": [] }),
        ));
        let sync = synchronizer(&SERVICES, store.clone());
        sync.load().await.unwrap();

        let card = sync.add_row("massageServices").await.unwrap();
        sync.set_row_field("massageServices", card, "title", "Thai massage")
            .await
            .unwrap();
        let discarded = sync.add_row("facialServices").await.unwrap();
        sync.remove_row("facialServices", discarded).await.unwrap();
        sync.save().await.unwrap();

        let doc = store.document("services-config").await.unwrap();
        assert_eq!(doc["massageServices"][0]["img"], "/assets/images/1.svg");
        assert_eq!(doc["massageServices"][0]["title"], "Thai massage");
        assert_eq!(doc["facialServices"], json!([]));
        assert_eq!(doc["hero"]["centerImages"][0]["src"], "4img.svg");

        assert!(matches!(
            sync.add_row("centerImages").await,
            Err(SyncError::Unsupported { .. })
        ));
    }

    #[tokio::test]
    async fn test_center_image_upload_reloads() {
        let store = Arc::new(
            MemoryStore::new().with_document("services-config", json!({ "hero": {} })),
        );
        let sync = synchronizer(&SERVICES, store.clone());
        sync.load().await.unwrap();

        sync.upload_asset("centerImage", 1, svg("mine.svg"))
            .await
            .unwrap();

        let upload = store
            .requests()
            .await
            .into_iter()
            .find(|r| r.path == "services/upload-svg")
            .unwrap();
        match upload.body {
            RecordedBody::Multipart { fields, file_name, .. } => {
                assert_eq!(file_name, "mine.svg");
                assert_eq!(
                    fields,
                    vec![
                        ("type".to_string(), "centerImage".to_string()),
                        ("filename".to_string(), "4img2.svg".to_string()),
                    ]
                );
            }
            other => panic!("unexpected body {other:?}"),
        }
        assert_eq!(store.count("GET", "services-config").await, 2);

        sync.upload_asset("heroImg", 0, svg("hero.svg")).await.unwrap();
        assert_eq!(store.count("GET", "services-config").await, 2);

        let url = sync.asset_url("heroImg", 0).unwrap();
        assert!(url.contains("/public/assets/images/servicesimg.svg?"));
    }

    #[tokio::test]
    async fn test_row_image_url_strips_directory() {
        let store = Arc::new(MemoryStore::new().with_document(
            "services-config",
            json!({ "facialServices": [{ "img": "/assets/images/9.svg" }] }),
        ));
        let sync = synchronizer(&SERVICES, store);
        sync.load().await.unwrap();

        let row = sync.rows("facialServices").await.unwrap()[0].id;
        let url = sync
            .row_image_url("facialServices", row)
            .await
            .unwrap()
            .unwrap();
        assert!(url.contains("/public/assets/images/9.svg?"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_is_loading_at_call_start() {
        let store = Arc::new(
            MemoryStore::new()
                .with_document("contact-config", json!({ "title": "A" }))
                .with_write_delay(Duration::from_millis(200)),
        );
        let sync = Arc::new(synchronizer(&CONTACT, store));
        sync.load().await.unwrap();

        let task = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.save().await })
        };
        tokio::task::yield_now().await;
        assert!(sync.status().is_loading("contact"));

        task.await.unwrap().unwrap();
        assert_eq!(
            sync.status().get("contact").unwrap().kind,
            StatusKind::Success
        );

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(sync.status().get("contact").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_saves_are_queued() {
        let store = Arc::new(
            MemoryStore::new()
                .with_document("contact-config", json!({ "title": "A" }))
                .with_write_delay(Duration::from_millis(100)),
        );
        let sync = synchronizer(&CONTACT, store.clone());
        sync.load().await.unwrap();

        let (first, second) = tokio::join!(sync.save(), sync.save());
        assert!(first.is_ok());
        assert!(second.is_ok());

        // The queued save used the token produced by the first one.
        assert_eq!(store.sha("contact-config").await.as_deref(), Some("v3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_save_sends_edit_made_while_waiting() {
        let store = Arc::new(
            MemoryStore::new()
                .with_document("contact-config", json!({ "title": "A" }))
                .with_write_delay(Duration::from_millis(100)),
        );
        let sync = Arc::new(synchronizer(&CONTACT, store.clone()));
        sync.load().await.unwrap();

        sync.set_field("title", "B").await.unwrap();
        let first = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.save().await })
        };
        tokio::task::yield_now().await;
        assert_eq!(store.count("POST", "contact-config").await, 1);

        sync.set_field("title", "C").await.unwrap();
        sync.save().await.unwrap();
        first.await.unwrap().unwrap();

        let doc = store.document("contact-config").await.unwrap();
        assert_eq!(doc["title"], "C");
        assert_eq!(store.sha("contact-config").await.as_deref(), Some("v3"));
        assert_eq!(sync.field("title").await.unwrap(), "C");
        assert_eq!(sync.token().await.as_deref(), Some("v3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_headline_update_sends_edit_made_while_waiting() {
        let store = Arc::new(
            MemoryStore::new()
                .with_untracked_document(
                    "slides",
                    json!({ "slides": [{ "headline": "Relax" }, { "headline": "Renew" }] }),
                )
                .with_list_route("slides", "slides", "/slides", "image")
                .with_write_delay(Duration::from_millis(100)),
        );
        let sync = Arc::new(synchronizer(&SLIDES, store.clone()));
        sync.load().await.unwrap();
        let rows = sync.rows("slides").await.unwrap();

        sync.set_row_field("slides", rows[0].id, "headline", "Breathe")
            .await
            .unwrap();
        let first = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.update_list_item("slides", 0).await })
        };
        tokio::task::yield_now().await;

        sync.set_row_field("slides", rows[1].id, "headline", "Restore")
            .await
            .unwrap();
        sync.update_list_item("slides", 1).await.unwrap();
        first.await.unwrap().unwrap();

        let doc = store.document("slides").await.unwrap();
        assert_eq!(doc["slides"][0]["headline"], "Breathe");
        assert_eq!(doc["slides"][1]["headline"], "Restore");
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_saves_are_rejected() {
        let store = Arc::new(
            MemoryStore::new()
                .with_document("contact-config", json!({ "title": "A" }))
                .with_write_delay(Duration::from_millis(100)),
        );
        let mut ctx = SyncContext::new(store.clone());
        ctx.gate = WriteGate::new(WritePolicy::Reject);
        let sync = SectionSynchronizer::new(&CONTACT, ctx);
        sync.load().await.unwrap();

        let (first, second) = tokio::join!(sync.save(), sync.save());
        assert!(first.is_ok());
        assert!(matches!(second, Err(SyncError::Busy(_))));
        assert_eq!(store.count("POST", "contact-config").await, 1);
    }
}
