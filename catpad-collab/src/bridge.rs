//! Bridge between the replicated document and the local reactive store.
//!
//! The bridge owns the session's local copy of the notebook. Local edits go
//! through [`SyncBridge::mutate`] as scoped mutations; remote edits arrive
//! as change packets and are reconciled in with minimal patches. Everything
//! runs on one logical thread: callers interleave `mutate` and `pump` from
//! their event loop, and nothing here blocks.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use catpad_core::{Declaration, Notebook};
use catpad_types::NotebookChange;

use crate::crdt::{DocHandle, Mutation, SyncPacket};
use crate::reconcile::reconcile;

pub struct SyncBridge {
    handle: Arc<dyn DocHandle>,
    rx: broadcast::Receiver<SyncPacket>,
    session_id: u64,
    store: Notebook<Declaration>,
    ready: bool,
    pending: Vec<Mutation>,
}

impl SyncBridge {
    /// Attach to a handle. The bridge starts not-ready with an empty store;
    /// `initialize` pulls the first authoritative snapshot.
    pub fn new(handle: Arc<dyn DocHandle>) -> Self {
        let rx = handle.subscribe();
        let session_id = handle.next_session_id();
        Self {
            handle,
            rx,
            session_id,
            store: Notebook::new(),
            ready: false,
            pending: Vec::new(),
        }
    }

    /// Readiness signal: false until the first snapshot has been loaded.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// The local reactive store. Unchanged cells keep their identity across
    /// reconciliations, so consumers can cache per-cell derived state.
    pub fn store(&self) -> &Notebook<Declaration> {
        &self.store
    }

    /// Pull the authoritative snapshot, mark the bridge ready, and submit
    /// any mutations deferred while the handle was unavailable.
    pub fn initialize(&mut self) -> Result<Vec<NotebookChange>> {
        let snapshot = self.handle.current_snapshot()?;
        let mut changes = reconcile(&mut self.store, &snapshot);
        self.ready = true;
        info!(
            session = self.session_id,
            cells = self.store.len(),
            "bridge ready"
        );

        let deferred = std::mem::take(&mut self.pending);
        if !deferred.is_empty() {
            debug!(count = deferred.len(), "submitting deferred mutations");
            for mutation in deferred {
                self.handle.submit(self.session_id, mutation)?;
            }
            changes.extend(self.resync()?);
        }
        Ok(changes)
    }

    /// Apply one scoped mutation: submit it to the replicated document, then
    /// reconcile the resulting snapshot back into the local store. Returns
    /// after submission, not after remote convergence.
    ///
    /// While the bridge is not ready the mutation is deferred, never failed;
    /// it is submitted during `initialize`.
    pub fn mutate(
        &mut self,
        f: impl FnOnce(&mut Notebook<Declaration>) + Send + 'static,
    ) -> Result<Vec<NotebookChange>> {
        if !self.ready {
            debug!(session = self.session_id, "handle not ready; deferring mutation");
            self.pending.push(Box::new(f));
            return Ok(Vec::new());
        }
        self.handle.submit(self.session_id, Box::new(f))?;
        self.resync()
    }

    /// Reconcile the local store against the current authoritative snapshot.
    pub fn resync(&mut self) -> Result<Vec<NotebookChange>> {
        let snapshot = self.handle.current_snapshot()?;
        let changes = reconcile(&mut self.store, &snapshot);
        if !changes.is_empty() {
            debug!(
                session = self.session_id,
                patches = changes.len(),
                "reconciled snapshot"
            );
        }
        Ok(changes)
    }

    /// Drain pending change packets without blocking, importing remote
    /// payloads and reconciling after each. Echoes of this session's own
    /// submissions are skipped; `mutate` already reconciled their effects.
    pub fn pump(&mut self) -> Result<Vec<NotebookChange>> {
        let mut changes = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(packet) => {
                    if packet.sender_id == self.session_id {
                        continue;
                    }
                    self.handle.import_update(&packet.payload)?;
                    changes.extend(self.resync()?);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "change stream lagged; resyncing from snapshot");
                    changes.extend(self.resync()?);
                }
                Err(TryRecvError::Closed) => break,
            }
        }
        Ok(changes)
    }

    /// Await the next remote change and reconcile it. Event-driven variant
    /// of [`SyncBridge::pump`].
    pub async fn next_change(&mut self) -> Result<Vec<NotebookChange>> {
        loop {
            match self.rx.recv().await {
                Ok(packet) => {
                    if packet.sender_id == self.session_id {
                        continue;
                    }
                    self.handle.import_update(&packet.payload)?;
                    return self.resync();
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "change stream lagged; resyncing from snapshot");
                    return self.resync();
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(Vec::new()),
            }
        }
    }

    /// Merge an update ferried from another replica and reconcile. The
    /// transport that carries payloads between processes lives outside the
    /// core; this is its entry point.
    pub fn apply_remote(&mut self, payload: &[u8]) -> Result<Vec<NotebookChange>> {
        self.handle.import_update(payload)?;
        self.resync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crdt::LoroNotebookDoc;
    use catpad_core::Cell;

    #[test]
    fn test_mutate_then_resync_is_idempotent() {
        let doc = Arc::new(LoroNotebookDoc::new());
        let mut bridge = SyncBridge::new(doc);
        bridge.initialize().unwrap();

        let changes = bridge.mutate(|nb| nb.push_cell(Cell::rich_text("hello"))).unwrap();
        assert_eq!(changes, vec![NotebookChange::CellInserted { index: 0 }]);

        // The store already equals the snapshot it just produced.
        assert!(bridge.resync().unwrap().is_empty());
    }

    #[test]
    fn test_mutation_deferred_until_ready() {
        let doc = Arc::new(LoroNotebookDoc::new());
        let mut bridge = SyncBridge::new(doc.clone());
        assert!(!bridge.is_ready());

        let changes = bridge.mutate(|nb| nb.push_cell(Cell::rich_text("queued"))).unwrap();
        assert!(changes.is_empty());
        assert!(doc.snapshot().unwrap().is_empty());

        let changes = bridge.initialize().unwrap();
        assert!(bridge.is_ready());
        assert_eq!(changes, vec![NotebookChange::CellInserted { index: 0 }]);
        assert_eq!(bridge.store().len(), 1);
    }

    #[test]
    fn test_pump_skips_own_echo_and_applies_peers() {
        let doc = Arc::new(LoroNotebookDoc::new());
        let mut alice = SyncBridge::new(doc.clone());
        let mut bob = SyncBridge::new(doc.clone());
        alice.initialize().unwrap();
        bob.initialize().unwrap();

        alice.mutate(|nb| nb.push_cell(Cell::rich_text("from alice"))).unwrap();

        // Alice's own echo produces no further patches.
        assert!(alice.pump().unwrap().is_empty());

        // Bob sees the insertion.
        let changes = bob.pump().unwrap();
        assert_eq!(changes, vec![NotebookChange::CellInserted { index: 0 }]);
        assert_eq!(bob.store(), alice.store());
    }

    #[test]
    fn test_apply_remote_from_other_replica() {
        let doc_a = Arc::new(LoroNotebookDoc::new());
        let doc_b = Arc::new(LoroNotebookDoc::new());
        let mut a = SyncBridge::new(doc_a.clone());
        let mut b = SyncBridge::new(doc_b);
        a.initialize().unwrap();
        b.initialize().unwrap();

        a.mutate(|nb| {
            nb.name = "shared".into();
            nb.push_cell(Cell::rich_text("x"));
        })
        .unwrap();

        let payload = doc_a.export_snapshot().unwrap();
        let changes = b.apply_remote(&payload).unwrap();
        assert!(changes.contains(&NotebookChange::NameChanged));
        assert_eq!(b.store(), a.store());
    }
}
