//! Section schemas
//!
//! A [`SectionSchema`] describes one remote content document: where it
//! lives, how a save body is wrapped, which fields the console edits, which
//! nested lists it carries and which image slots can be uploaded for it.
//! The synchronizer is generic; everything section-specific lives here.

pub mod sections;

use serde_json::{Map, Value};

pub use sections::{ABOUT_US, ALL, BLOG, CONTACT, SERVICES, SLIDES, WELCOME};

/// Whether writes to a section carry the `sha` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPolicy {
    /// Every write must echo the token captured on the last load.
    Required,
    /// The document has no token on the wire.
    Untracked,
}

/// How a whole-document save body is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// `{ "<name>": { ...fields }, "sha": ... }`
    Wrapped(&'static str),
    /// `{ ...fields, "sha": ... }`
    Flat,
}

/// How a field is edited locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A plain string.
    Text,
    /// An array of strings, edited as newline-separated text.
    Lines,
}

/// One editable scalar field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Name used by callers (`bookButton.text`)
    pub name: &'static str,
    /// JSON pointer into the document (`/bookButton/text`)
    pub pointer: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn text(name: &'static str, pointer: &'static str) -> Self {
        Self {
            name,
            pointer,
            kind: FieldKind::Text,
        }
    }

    pub const fn lines(name: &'static str, pointer: &'static str) -> Self {
        Self {
            name,
            pointer,
            kind: FieldKind::Lines,
        }
    }
}

/// Which status key a per-row operation reports under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatusKey {
    /// Every row shares one key.
    Shared(&'static str),
    /// `<prefix>-<index>`, one indicator per row.
    PerRow(&'static str),
}

impl RowStatusKey {
    pub fn key_for(&self, index: usize) -> String {
        match self {
            RowStatusKey::Shared(key) => (*key).to_string(),
            RowStatusKey::PerRow(prefix) => format!("{prefix}-{index}"),
        }
    }
}

/// A per-row update endpoint carrying `{ index, <field>: value }`.
#[derive(Debug, Clone, Copy)]
pub struct UpdateRoute {
    pub path: &'static str,
    pub field: &'static str,
}

/// Endpoints for lists the store mutates itself.
#[derive(Debug, Clone, Copy)]
pub struct RemoteListOps {
    /// Multipart add endpoint
    pub add_path: &'static str,
    /// JSON delete endpoint
    pub delete_path: &'static str,
    /// Optional per-row update endpoint
    pub update: Option<UpdateRoute>,
    /// Scalar fields sent alongside the file on add
    pub add_fields: &'static [&'static str],
    /// Add fields that must be non-empty
    pub required_fields: &'static [&'static str],
    /// Status key for the add form
    pub add_status_key: &'static str,
}

/// A nested list inside a section document.
#[derive(Debug, Clone, Copy)]
pub struct ListSpec {
    pub name: &'static str,
    pub pointer: &'static str,
    /// Human label used in messages ("service card")
    pub label: &'static str,
    /// Fields a row exposes for editing
    pub item_fields: &'static [&'static str],
    pub row_status: RowStatusKey,
    /// Set when the store owns add/delete for this list
    pub remote: Option<RemoteListOps>,
    /// Template for rows added locally, given the current row count
    pub new_row: Option<fn(usize) -> Map<String, Value>>,
    /// Asset directory under the public asset root
    pub asset_dir: Option<&'static str>,
    /// Row field holding the image file name
    pub image_field: Option<&'static str>,
}

impl ListSpec {
    /// Rows of a local list are only persisted through a document save.
    pub fn is_local(&self) -> bool {
        self.remote.is_none()
    }
}

/// An uploadable image slot with a conventional file name.
#[derive(Debug, Clone, Copy)]
pub struct AssetSlot {
    pub name: &'static str,
    /// Value sent as the `type` form field
    pub upload_type: &'static str,
    /// File name for the slot at a given index
    pub file_name: fn(usize) -> String,
    pub asset_dir: &'static str,
    /// Re-fetch the section after a successful upload
    pub reload: bool,
}

/// Static description of one content section.
#[derive(Debug)]
pub struct SectionSchema {
    /// Stable key, also the status key for loads and saves
    pub key: &'static str,
    /// Document path for GET and POST
    pub path: &'static str,
    /// `None` when the section has no whole-document save
    pub envelope: Option<Envelope>,
    pub token: TokenPolicy,
    pub fields: &'static [FieldSpec],
    pub lists: &'static [ListSpec],
    pub assets: &'static [AssetSlot],
    /// Multipart endpoint for asset slots
    pub asset_upload_path: Option<&'static str>,
}

impl SectionSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn list(&self, name: &str) -> Option<&ListSpec> {
        self.lists.iter().find(|l| l.name == name)
    }

    pub fn asset(&self, name: &str) -> Option<&AssetSlot> {
        self.assets.iter().find(|a| a.name == name)
    }

    pub fn requires_token(&self) -> bool {
        self.token == TokenPolicy::Required
    }
}

/// Look up a registered schema by key.
pub fn find(key: &str) -> Option<&'static SectionSchema> {
    ALL.iter().copied().find(|s| s.key == key)
}
