//! Violation records and the bounded, persisted violation log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::capabilities::{Clock, PageContext};
use crate::error::StoreResult;
use crate::storage::{KeyValueStore, SECURITY_VIOLATIONS_KEY};

/// What was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Right-click context menu.
    ContextMenu,
    /// Developer-surface, view-source, save-page, or guarded select-all chord.
    ForbiddenShortcut,
    /// Size or timing heuristic says developer tools are open.
    ToolsOpenHeuristic,
}

impl ViolationKind {
    /// Title shown on the warning overlay.
    pub fn headline(&self) -> &'static str {
        match self {
            ViolationKind::ContextMenu => "Right-click is disabled",
            ViolationKind::ForbiddenShortcut => "This shortcut is disabled",
            ViolationKind::ToolsOpenHeuristic => "Developer tools detected",
        }
    }
}

/// One detected inspection or tamper attempt. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "url")]
    pub current_url: String,
    pub user_agent: String,
}

impl Violation {
    pub fn new(
        kind: ViolationKind,
        timestamp: DateTime<Utc>,
        current_url: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            timestamp,
            current_url: current_url.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Stamp a violation from the live page.
    pub fn observe(kind: ViolationKind, clock: &dyn Clock, page: &dyn PageContext) -> Self {
        Self::new(kind, clock.timestamp(), page.current_url(), page.user_agent())
    }
}

/// Most recent `capacity` violations, oldest first, persisted under `security-violations`.
///
/// Appends are read-modify-write on the store, so they run under a single-writer lock.
pub struct ViolationLog {
    store: Arc<dyn KeyValueStore>,
    capacity: usize,
    write_lock: Mutex<()>,
}

impl ViolationLog {
    pub fn new(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Persisted entries, oldest first. A corrupt value reads as empty.
    pub fn entries(&self) -> StoreResult<Vec<Violation>> {
        let raw = match self.store.get(SECURITY_VIOLATIONS_KEY)? {
            Some(raw) => raw,
            None => return Ok(Vec::new()),
        };
        match serde_json::from_str::<Vec<Violation>>(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!("[SENTINEL] Discarding unreadable violation log: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Append, evicting the oldest entries past capacity. Returns the new length.
    pub fn append(&self, violation: Violation) -> StoreResult<usize> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut entries = self.entries()?;
        entries.push(violation);
        if entries.len() > self.capacity {
            let overflow = entries.len() - self.capacity;
            entries.drain(..overflow);
        }
        let json = serde_json::to_string(&entries)?;
        self.store.set(SECURITY_VIOLATIONS_KEY, &json)?;
        Ok(entries.len())
    }

    pub fn clear(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.store.remove(SECURITY_VIOLATIONS_KEY)
    }
}
