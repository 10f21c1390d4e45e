//! Local editable state for one section document
//!
//! A [`SectionState`] is built from a fetched document and the section's
//! schema. Scalar fields become strings (missing ones fall back to empty),
//! nested lists become [`Row`]s with a local [`RowId`] so edits bind to a
//! row rather than to its position. Writing back overlays the local state
//! onto the last fetched document, so fields the console does not edit
//! travel through unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::schema::{Envelope, FieldKind, SectionSchema};

/// Name of the concurrency token property on the wire.
pub const TOKEN_FIELD: &str = "sha";

/// Local identity of a list row. Never sent to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowId(Uuid);

impl RowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One element of a nested list.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: RowId,
    pub fields: Map<String, Value>,
}

impl Row {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            id: RowId::new(),
            fields,
        }
    }

    /// String value of a field, empty when absent or not a string.
    pub fn get(&self, field: &str) -> &str {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.fields
            .insert(field.to_string(), Value::String(value.into()));
    }
}

/// Editable projection of one fetched document.
#[derive(Debug, Clone, Default)]
pub struct SectionState {
    fields: HashMap<String, String>,
    lists: HashMap<String, Vec<Row>>,
    token: Option<String>,
    snapshot: Value,
    loaded: bool,
}

impl SectionState {
    /// Build local state from a fetched document.
    pub fn from_document(schema: &SectionSchema, doc: &Value) -> Self {
        let token = doc
            .get(TOKEN_FIELD)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from);

        let mut snapshot = doc.clone();
        if let Value::Object(map) = &mut snapshot {
            map.remove(TOKEN_FIELD);
        }

        let fields = schema
            .fields
            .iter()
            .map(|spec| {
                let value = match spec.kind {
                    FieldKind::Text => doc
                        .pointer(spec.pointer)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    FieldKind::Lines => doc
                        .pointer(spec.pointer)
                        .and_then(Value::as_array)
                        .map(|lines| {
                            lines
                                .iter()
                                .filter_map(Value::as_str)
                                .collect::<Vec<_>>()
                                .join("\n")
                        })
                        .unwrap_or_default(),
                };
                (spec.name.to_string(), value)
            })
            .collect();

        let lists = schema
            .lists
            .iter()
            .map(|spec| {
                let rows = doc
                    .pointer(spec.pointer)
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_object)
                            .map(|item| Row::new(item.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                (spec.name.to_string(), rows)
            })
            .collect();

        Self {
            fields,
            lists,
            token,
            snapshot,
            loaded: true,
        }
    }

    /// Whether a document has been fetched into this state.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub(crate) fn set_field(&mut self, name: &str, value: String) {
        self.fields.insert(name.to_string(), value);
    }

    /// Field values in schema order.
    pub fn fields<'a>(&'a self, schema: &'a SectionSchema) -> Vec<(&'static str, &'a str)> {
        schema
            .fields
            .iter()
            .map(|spec| (spec.name, self.field(spec.name).unwrap_or_default()))
            .collect()
    }

    pub fn rows(&self, list: &str) -> &[Row] {
        self.lists.get(list).map(Vec::as_slice).unwrap_or_default()
    }

    pub(crate) fn rows_mut(&mut self, list: &str) -> &mut Vec<Row> {
        self.lists.entry(list.to_string()).or_default()
    }

    /// Position of a row in its list.
    pub fn index_of(&self, list: &str, row: RowId) -> Option<usize> {
        self.rows(list).iter().position(|r| r.id == row)
    }

    /// Reconstruct the full document from the snapshot and local edits.
    pub fn to_document(&self, schema: &SectionSchema) -> Value {
        let mut doc = match &self.snapshot {
            Value::Object(map) => Value::Object(map.clone()),
            _ => Value::Object(Map::new()),
        };

        for spec in schema.fields {
            let local = self.field(spec.name).unwrap_or_default();
            let value = match spec.kind {
                FieldKind::Text => Value::String(local.to_string()),
                FieldKind::Lines => Value::Array(
                    local
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(|line| Value::String(line.to_string()))
                        .collect(),
                ),
            };
            set_pointer(&mut doc, spec.pointer, value);
        }

        for spec in schema.lists {
            let items = self
                .rows(spec.name)
                .iter()
                .map(|row| Value::Object(row.fields.clone()))
                .collect();
            set_pointer(&mut doc, spec.pointer, Value::Array(items));
        }

        doc
    }

    /// Build the save request body for the given envelope.
    pub fn write_body(&self, schema: &SectionSchema, envelope: Envelope) -> Value {
        let doc = self.to_document(schema);
        let mut body = match envelope {
            Envelope::Flat => match doc {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            Envelope::Wrapped(name) => {
                let mut map = Map::new();
                map.insert(name.to_string(), doc);
                map
            }
        };

        if schema.requires_token() {
            let token = self
                .token
                .as_ref()
                .map(|t| Value::String(t.clone()))
                .unwrap_or(Value::Null);
            body.insert(TOKEN_FIELD.to_string(), token);
        }

        Value::Object(body)
    }
}

/// Write `value` at a JSON pointer, creating intermediate objects.
pub(crate) fn set_pointer(doc: &mut Value, pointer: &str, value: Value) {
    let segments: Vec<String> = pointer
        .split('/')
        .skip(1)
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect();

    let Some((last, parents)) = segments.split_last() else {
        *doc = value;
        return;
    };

    let mut cursor = doc;
    for segment in parents {
        if !cursor.is_object() {
            *cursor = Value::Object(Map::new());
        }
        cursor = match *cursor {
            Value::Object(ref mut map) => map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return,
        };
    }

    if !cursor.is_object() {
        *cursor = Value::Object(Map::new());
    }
    if let Value::Object(map) = cursor {
        map.insert(last.clone(), value);
    }
}
