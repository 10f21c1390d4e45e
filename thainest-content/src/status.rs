//! Keyed operation status
//!
//! Every operation reports `loading` when it starts and `success` or
//! `error` when it settles. Terminal statuses expire after the display
//! duration unless a newer status for the same key replaces them first;
//! `loading` stays until its operation settles.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// How long a terminal status stays visible.
pub const DEFAULT_STATUS_TTL: Duration = Duration::from_secs(5);

const EVENT_CAPACITY: usize = 64;

/// Kind of an operation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Loading,
    Success,
    Error,
}

impl StatusKind {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StatusKind::Loading)
    }
}

/// A status as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

/// Broadcast whenever a key changes. `status: None` means the key went idle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct StatusUpdate {
    pub key: String,
    pub status: Option<Status>,
}

#[derive(Debug, Clone)]
struct Entry {
    status: Status,
    generation: u64,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

struct BoardInner {
    entries: DashMap<String, Entry>,
    generation: AtomicU64,
    ttl: Duration,
    events: broadcast::Sender<StatusUpdate>,
}

/// Shared, cloneable status projection keyed by operation key.
///
/// # Example
///
/// ```rust
/// use thainest_content::{StatusBoard, StatusKind};
///
/// # #[tokio::main]
/// # async fn main() {
/// let board = StatusBoard::default();
/// board.loading("contact", "Loading...");
/// assert!(board.is_loading("contact"));
///
/// board.success("contact", "Saved");
/// assert_eq!(board.get("contact").map(|s| s.kind), Some(StatusKind::Success));
/// # }
/// ```
#[derive(Clone)]
pub struct StatusBoard {
    inner: Arc<BoardInner>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_TTL)
    }
}

impl StatusBoard {
    /// Create a board whose terminal statuses live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(BoardInner {
                entries: DashMap::new(),
                generation: AtomicU64::new(0),
                ttl,
                events,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Replace the status for `key`.
    pub fn set(&self, key: &str, kind: StatusKind, message: impl Into<String>) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let expires_at = kind.is_terminal().then(|| Instant::now() + self.inner.ttl);
        let status = Status {
            kind,
            message: message.into(),
        };

        self.inner.entries.insert(
            key.to_string(),
            Entry {
                status: status.clone(),
                generation,
                expires_at,
            },
        );
        let _ = self.inner.events.send(StatusUpdate {
            key: key.to_string(),
            status: Some(status),
        });

        if let Some(deadline) = expires_at {
            self.schedule_expiry(key.to_string(), generation, deadline);
        }
    }

    pub fn loading(&self, key: &str, message: impl Into<String>) {
        self.set(key, StatusKind::Loading, message);
    }

    pub fn success(&self, key: &str, message: impl Into<String>) {
        self.set(key, StatusKind::Success, message);
    }

    pub fn error(&self, key: &str, message: impl Into<String>) {
        self.set(key, StatusKind::Error, message);
    }

    /// Current status for `key`, `None` when idle.
    pub fn get(&self, key: &str) -> Option<Status> {
        let now = Instant::now();
        self.inner
            .entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.status.clone())
    }

    pub fn is_loading(&self, key: &str) -> bool {
        matches!(self.get(key), Some(Status { kind: StatusKind::Loading, .. }))
    }

    /// All live statuses, sorted by key.
    pub fn snapshot(&self) -> Vec<(String, Status)> {
        let now = Instant::now();
        let mut live: Vec<_> = self
            .inner
            .entries
            .iter()
            .filter(|entry| entry.is_live(now))
            .map(|entry| (entry.key().clone(), entry.status.clone()))
            .collect();
        live.sort_by(|a, b| a.0.cmp(&b.0));
        live
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.inner.events.subscribe()
    }

    fn expire(&self, key: &str, generation: u64) {
        let removed = self
            .inner
            .entries
            .remove_if(key, |_, entry| entry.generation == generation);
        if removed.is_some() {
            let _ = self.inner.events.send(StatusUpdate {
                key: key.to_string(),
                status: None,
            });
        }
    }

    // Without a runtime the entry still reads as expired through `get`.
    fn schedule_expiry(&self, key: String, generation: u64, deadline: Instant) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let board = self.clone();
        handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            board.expire(&key, generation);
        });
    }
}

impl std::fmt::Debug for StatusBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusBoard")
            .field("ttl", &self.inner.ttl)
            .field("live", &self.snapshot().len())
            .finish()
    }
}
