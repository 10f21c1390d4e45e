//! Per-section write serialization
//!
//! The store guards documents with an optimistic `sha` token, which only
//! holds if one client does not race itself. The gate keeps at most one
//! write per section key in flight: writes either wait their turn or are
//! turned away, depending on the policy.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{Result, SyncError};

/// What happens to a write that arrives while another is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritePolicy {
    /// Wait for the in-flight write to finish
    #[default]
    Queue,
    /// Fail immediately with [`SyncError::Busy`]
    Reject,
}

impl FromStr for WritePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "queue" => Ok(WritePolicy::Queue),
            "reject" => Ok(WritePolicy::Reject),
            other => Err(format!("unknown write policy: {other}")),
        }
    }
}

/// Held for the duration of one write.
pub type WritePermit = OwnedMutexGuard<()>;

/// Exclusive-write discipline keyed by section.
#[derive(Clone, Default)]
pub struct WriteGate {
    policy: WritePolicy,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl WriteGate {
    pub fn new(policy: WritePolicy) -> Self {
        Self {
            policy,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    /// Take the write permit for `key`.
    pub async fn acquire(&self, key: &str) -> Result<WritePermit> {
        let lock = self.lock_for(key);
        match self.policy {
            WritePolicy::Queue => Ok(lock.lock_owned().await),
            WritePolicy::Reject => lock
                .try_lock_owned()
                .map_err(|_| SyncError::Busy(key.to_string())),
        }
    }

    /// Whether a write for `key` is currently in flight.
    pub fn is_busy(&self, key: &str) -> bool {
        self.locks
            .get(key)
            .map(|lock| lock.try_lock().is_err())
            .unwrap_or(false)
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks.entry(key.to_string()).or_default().clone()
    }
}

impl std::fmt::Debug for WriteGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteGate")
            .field("policy", &self.policy)
            .field("keys", &self.locks.len())
            .finish()
    }
}
