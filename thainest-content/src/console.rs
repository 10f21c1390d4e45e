//! Admin console: every site section behind one store

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;

use crate::assets::AssetUrls;
use crate::error::Result;
use crate::gate::{WriteGate, WritePolicy};
use crate::messages::{Locale, Messages};
use crate::schema::ALL;
use crate::status::{StatusBoard, StatusUpdate, DEFAULT_STATUS_TTL};
use crate::store::ContentStore;
use crate::synchronizer::{SectionSynchronizer, SyncContext};
use crate::types::DEFAULT_ASSET_URL;

/// Console-wide settings
#[derive(Debug, Clone)]
pub struct ConsoleSettings {
    /// How long success and error statuses stay visible (default: 5s)
    pub status_ttl: Duration,
    /// What to do with a write that overlaps another on the same section
    pub write_policy: WritePolicy,
    pub locale: Locale,
    /// Public root the site serves images from
    pub asset_base_url: String,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            status_ttl: DEFAULT_STATUS_TTL,
            write_policy: WritePolicy::default(),
            locale: Locale::default(),
            asset_base_url: DEFAULT_ASSET_URL.to_string(),
        }
    }
}

/// One synchronizer per registered section, sharing status board and
/// write gate.
pub struct AdminConsole {
    ctx: SyncContext,
    sections: Vec<Arc<SectionSynchronizer>>,
}

impl AdminConsole {
    pub fn new(store: Arc<dyn ContentStore>, settings: ConsoleSettings) -> Self {
        let ctx = SyncContext {
            store,
            status: StatusBoard::new(settings.status_ttl),
            gate: WriteGate::new(settings.write_policy),
            messages: Messages::new(settings.locale),
            assets: AssetUrls::new(settings.asset_base_url),
        };

        let sections = ALL
            .iter()
            .copied()
            .map(|schema| Arc::new(SectionSynchronizer::new(schema, ctx.clone())))
            .collect();

        Self { ctx, sections }
    }

    /// Synchronizer for a section key.
    pub fn section(&self, key: &str) -> Option<Arc<SectionSynchronizer>> {
        self.sections.iter().find(|s| s.key() == key).cloned()
    }

    /// All synchronizers in display order.
    pub fn sections(&self) -> &[Arc<SectionSynchronizer>] {
        &self.sections
    }

    pub fn status(&self) -> &StatusBoard {
        &self.ctx.status
    }

    pub fn messages(&self) -> Messages {
        self.ctx.messages
    }

    /// Subscribe to status changes across every section.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.ctx.status.subscribe()
    }

    /// Load every section, one after another.
    ///
    /// A failing section does not stop the others.
    pub async fn load_all(&self) -> Vec<(&'static str, Result<()>)> {
        let mut results = Vec::with_capacity(self.sections.len());
        for section in &self.sections {
            results.push((section.key(), section.load().await));
        }

        let loaded = results.iter().filter(|(_, r)| r.is_ok()).count();
        info!(store = self.ctx.store.id(), loaded, total = results.len(), "Sections loaded");
        results
    }
}

impl std::fmt::Debug for AdminConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConsole")
            .field("ctx", &self.ctx)
            .field("sections", &self.sections.len())
            .finish()
    }
}
