//! Shared types for catpad
//!
//! This crate provides common types used across the catpad ecosystem,
//! including cell/declaration identifiers, the identifier generator, and
//! the change events emitted by reconciliation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cell identifier
///
/// Minted once at cell creation, immutable afterwards, never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub String);

impl CellId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh, globally unique cell identifier.
    pub fn fresh() -> Self {
        Self(fresh_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Declaration identifier
///
/// Identifies a formal declaration (object or morphism) inside a notebook.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclarationId(pub String);

impl DeclarationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh, globally unique declaration identifier.
    pub fn fresh() -> Self {
        Self(fresh_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Mint a globally unique identifier, sortable by creation time.
///
/// UUIDv7 carries a millisecond timestamp in its high bits, so identifiers
/// sort in creation order and keep keyed snapshot diffs cheap. Generation
/// must never fail: if the system clock reads before the Unix epoch, the
/// generator degrades to a process-local counter plus a random suffix
/// instead of erroring.
pub fn fresh_id() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(now) => {
            let ts = uuid::Timestamp::from_unix(uuid::NoContext, now.as_secs(), now.subsec_nanos());
            Uuid::new_v7(ts).to_string()
        }
        Err(_) => {
            let n = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
            format!("fb-{:016x}-{}", n, Uuid::new_v4().simple())
        }
    }
}

/// Notebook change event
///
/// One minimal patch applied to the local store during reconciliation.
/// Indices refer to the store's cell list at the moment the patch is
/// applied, so a consumer replaying the events in order sees the same
/// intermediate states the store went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotebookChange {
    /// A new cell appeared at this position
    CellInserted { index: usize },

    /// The cell at this position was removed
    CellRemoved { index: usize },

    /// The cell at this position kept its identity but changed content
    CellReplaced { index: usize },

    /// The notebook was renamed
    NameChanged,
}
