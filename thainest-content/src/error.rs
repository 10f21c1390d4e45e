//! Error types for the content client

use thiserror::Error;

use crate::document::RowId;

/// Content store error
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned a non-2xx response
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A local check that failed before any request was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Precondition {
    #[error("no concurrency token for section {0}, load it first")]
    MissingToken(String),

    #[error("an SVG attachment is required")]
    MissingAttachment,

    #[error("field {0} is required")]
    MissingField(String),

    #[error("section {section} has no field {field}")]
    UnknownField { section: String, field: String },

    #[error("section {section} has no list {list}")]
    UnknownList { section: String, list: String },

    #[error("section {section} has no asset slot {slot}")]
    UnknownAsset { section: String, slot: String },

    #[error("list {list} has no row at index {index}")]
    IndexOutOfRange { list: String, index: usize },

    #[error("list {list} has no row {row}")]
    UnknownRow { list: String, row: RowId },
}

/// Synchronizer error
#[derive(Debug, Error)]
pub enum SyncError {
    /// Detected locally, nothing was sent
    #[error("Precondition failed: {0}")]
    Precondition(#[from] Precondition),

    /// Network failure or unreadable response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The store answered with a non-2xx status
    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Another write for the same section is in flight
    #[error("A write for section {0} is already in progress")]
    Busy(String),

    /// The section schema does not offer this operation
    #[error("Section {section} does not support {operation}")]
    Unsupported {
        section: String,
        operation: &'static str,
    },
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Server { status, message } => SyncError::Rejected { status, message },
            other => SyncError::Transport(other.to_string()),
        }
    }
}

/// Result type for synchronizer operations
pub type Result<T> = std::result::Result<T, SyncError>;
