//! Thainest content client
//!
//! Edits the Thainest site's content sections through the remote content
//! API. Each section is a JSON document guarded by an optimistic `sha`
//! token; a [`SectionSynchronizer`] keeps an editable copy, writes it back
//! and re-fetches after every successful write.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │               AdminConsole               │
//! │   (one synchronizer per site section)    │
//! └────────────────────┬─────────────────────┘
//!                      │
//!      ┌───────────────┼────────────────┐
//!      ▼               ▼                ▼
//! ┌──────────┐   ┌───────────┐   ┌─────────────┐
//! │ Section  │   │ WriteGate │   │ StatusBoard │
//! │ schemas  │   │ (per key) │   │ (5s expiry) │
//! └──────────┘   └───────────┘   └─────────────┘
//!                      │
//!                      ▼
//!              ┌───────────────┐
//!              │ ContentStore  │
//!              │ (HTTP/memory) │
//!              └───────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use thainest_content::{AdminConsole, ConsoleSettings, HttpStore, StoreConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = HttpStore::new(StoreConfig::default())?;
//! let console = AdminConsole::new(Arc::new(store), ConsoleSettings::default());
//!
//! let contact = console.section("contact").expect("registered section");
//! contact.load().await?;
//! contact.set_field("phone", "+66 2 123 4567").await?;
//! contact.save().await?;
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod confirm;
pub mod console;
pub mod document;
pub mod error;
pub mod gate;
pub mod messages;
pub mod schema;
pub mod status;
pub mod store;
pub mod synchronizer;
pub mod types;

// Re-export main types
pub use assets::AssetUrls;
pub use confirm::{AutoConfirm, Confirm};
pub use console::{AdminConsole, ConsoleSettings};
pub use document::{Row, RowId, SectionState};
pub use error::{Precondition, Result, StoreError, StoreResult, SyncError};
pub use gate::{WriteGate, WritePolicy};
pub use messages::{Locale, Messages};
pub use schema::SectionSchema;
pub use status::{Status, StatusBoard, StatusKind, StatusUpdate, DEFAULT_STATUS_TTL};
pub use store::{ContentStore, HttpStore, MemoryStore};
pub use synchronizer::{DeleteOutcome, ItemDraft, SectionSynchronizer, SyncContext};
pub use types::*;
