//! Loro-backed replicated notebook document.
//!
//! The notebook lives in two containers: a "cells" LoroList of JSON-encoded
//! cells and a "meta" LoroMap holding the notebook name. Loro's merge
//! machinery is the conflict-resolution black box; this module only reads
//! and writes containers and never resolves conflicts itself.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, Result};
use loro::{ExportMode, LoroDoc, LoroList, LoroMap};
use tokio::sync::broadcast;
use tracing::warn;

use catpad_core::{Cell, Declaration, Notebook};
use catpad_types::CellId;

/// One change notification fanned out to subscribed peers.
///
/// `sender_id` lets a session skip echoes of its own submissions.
#[derive(Clone, Debug)]
pub struct SyncPacket {
    pub sender_id: u64,
    pub payload: Vec<u8>,
}

/// A scoped mutation: one atomic logical edit of the notebook.
pub type Mutation = Box<dyn FnOnce(&mut Notebook<Declaration>) + Send>;

/// Abstract interface to the replicated document.
///
/// The bridge consumes this and treats it as opaque: snapshots out,
/// mutations in, change packets over the subscription. Implementations other
/// than [`LoroNotebookDoc`] (a network proxy, a test double) plug in here.
pub trait DocHandle: Send + Sync {
    /// The current authoritative snapshot.
    fn current_snapshot(&self) -> Result<Notebook<Declaration>>;

    /// Apply one scoped mutation to the authoritative document and broadcast
    /// the result. Returns after submission, not after remote convergence.
    fn submit(&self, session_id: u64, mutation: Mutation) -> Result<()>;

    /// Subscribe to change packets.
    fn subscribe(&self) -> broadcast::Receiver<SyncPacket>;

    /// Merge an update ferried from another replica.
    fn import_update(&self, payload: &[u8]) -> Result<()>;

    /// Allocate an identifier for a new editing session on this document.
    fn next_session_id(&self) -> u64;
}

/// A collaborative notebook document using Loro.
pub struct LoroNotebookDoc {
    doc: LoroDoc,
    tx: broadcast::Sender<SyncPacket>,
    session_counter: AtomicU64,
}

impl LoroNotebookDoc {
    /// Create an empty document with initialized containers.
    pub fn new() -> Self {
        let doc = LoroDoc::new();
        let (tx, _) = broadcast::channel(128);

        let _ = doc.get_list("cells");
        let _ = doc.get_map("meta");

        Self {
            doc,
            tx,
            session_counter: AtomicU64::new(1),
        }
    }

    /// Create a document holding an initial notebook.
    pub fn with_notebook(notebook: &Notebook<Declaration>) -> Result<Self> {
        let this = Self::new();
        this.write_notebook(notebook)?;
        Ok(this)
    }

    fn cells_list(&self) -> LoroList {
        self.doc.get_list("cells")
    }

    fn meta_map(&self) -> LoroMap {
        self.doc.get_map("meta")
    }

    fn read_name(&self) -> String {
        match self.meta_map().get("name") {
            Some(loro::ValueOrContainer::Value(value)) => value
                .as_string()
                .map(|s| s.to_string())
                .unwrap_or_default(),
            _ => String::new(),
        }
    }

    /// Cell rows as (id, json) pairs in document order. Rows that fail to
    /// parse are skipped; a malformed row must not take the session down.
    fn read_rows(&self) -> Vec<(CellId, String)> {
        let list = self.cells_list();
        let mut rows = Vec::new();
        for i in 0..list.len() {
            let Some(loro::ValueOrContainer::Value(value)) = list.get(i) else {
                continue;
            };
            let Some(json) = value.as_string() else {
                continue;
            };
            match serde_json::from_str::<Cell<Declaration>>(json) {
                Ok(cell) => rows.push((cell.id().clone(), json.to_string())),
                Err(err) => warn!(row = i, %err, "skipping malformed cell row"),
            }
        }
        rows
    }

    /// Decode the full notebook from the containers.
    pub fn snapshot(&self) -> Result<Notebook<Declaration>> {
        let mut cells = Vec::new();
        for (_, json) in self.read_rows() {
            cells.push(serde_json::from_str::<Cell<Declaration>>(&json)?);
        }
        Ok(Notebook {
            name: self.read_name(),
            cells,
        })
    }

    /// Write a notebook into the containers with a minimal, id-keyed diff.
    ///
    /// Untouched rows are left alone so concurrent edits to them merge
    /// instead of being clobbered by a full rewrite.
    pub fn write_notebook(&self, notebook: &Notebook<Declaration>) -> Result<()> {
        if self.read_name() != notebook.name {
            self.meta_map().insert("name", notebook.name.clone())?;
        }

        let list = self.cells_list();
        let mut target = Vec::with_capacity(notebook.len());
        for cell in &notebook.cells {
            target.push((cell.id().clone(), serde_json::to_string(cell)?));
        }
        let keep: HashSet<&CellId> = target.iter().map(|(id, _)| id).collect();

        // Drop rows whose cell vanished, back to front so indices stay valid.
        let mut rows = self.read_rows();
        for i in (0..rows.len()).rev() {
            if !keep.contains(&rows[i].0) {
                list.delete(i, 1)?;
                rows.remove(i);
            }
        }

        // Align the remaining rows with the target order.
        for (j, (id, json)) in target.iter().enumerate() {
            match rows.get(j) {
                Some((row_id, row_json)) if row_id == id => {
                    if row_json != json {
                        list.delete(j, 1)?;
                        list.insert(j, json.clone())?;
                        rows[j].1 = json.clone();
                    }
                }
                _ => {
                    // A surviving id not at its slot moved; re-home it.
                    if let Some(k) = rows.iter().position(|(row_id, _)| row_id == id) {
                        list.delete(k, 1)?;
                        rows.remove(k);
                    }
                    list.insert(j, json.clone())?;
                    rows.insert(j, (id.clone(), json.clone()));
                }
            }
        }

        Ok(())
    }

    /// Export full state for sync.
    pub fn export_snapshot(&self) -> Result<Vec<u8>> {
        self.doc
            .export(ExportMode::Snapshot)
            .map_err(|e| anyhow!("export error: {:?}", e))
    }

    pub fn broadcast(&self, payload: Vec<u8>, sender_id: u64) {
        let _ = self.tx.send(SyncPacket { sender_id, payload });
    }
}

impl Default for LoroNotebookDoc {
    fn default() -> Self {
        Self::new()
    }
}

impl DocHandle for LoroNotebookDoc {
    fn current_snapshot(&self) -> Result<Notebook<Declaration>> {
        self.snapshot()
    }

    fn submit(&self, session_id: u64, mutation: Mutation) -> Result<()> {
        let mut notebook = self.snapshot()?;
        mutation(&mut notebook);
        self.write_notebook(&notebook)?;
        let update = self.export_snapshot()?;
        self.broadcast(update, session_id);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SyncPacket> {
        self.tx.subscribe()
    }

    fn import_update(&self, payload: &[u8]) -> Result<()> {
        self.doc.import(payload)?;
        Ok(())
    }

    fn next_session_id(&self) -> u64 {
        self.session_counter.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catpad_core::{MorTypeRef, MorphismDecl, ObTypeRef, ObjectDecl};

    fn sample_notebook() -> Notebook<Declaration> {
        let mut nb = Notebook::new();
        nb.name = "N".into();
        nb.push_cell(Cell::rich_text("intro"));
        nb.push_cell(Cell::formal(Declaration::Object(ObjectDecl::new(
            "A",
            ObTypeRef::new("Entity"),
        ))));
        nb.push_cell(Cell::formal(Declaration::Morphism(MorphismDecl::new(
            "f",
            MorTypeRef::new("Hom"),
        ))));
        nb
    }

    #[test]
    fn test_write_then_snapshot_roundtrip() {
        let nb = sample_notebook();
        let doc = LoroNotebookDoc::with_notebook(&nb).unwrap();
        assert_eq!(doc.snapshot().unwrap(), nb);
    }

    #[test]
    fn test_rewrite_same_notebook_is_stable() {
        let nb = sample_notebook();
        let doc = LoroNotebookDoc::with_notebook(&nb).unwrap();
        doc.write_notebook(&nb).unwrap();
        assert_eq!(doc.snapshot().unwrap(), nb);
    }

    #[test]
    fn test_incremental_write_removal_and_move() {
        let mut nb = sample_notebook();
        let doc = LoroNotebookDoc::with_notebook(&nb).unwrap();

        nb.remove_cell(0);
        nb.swap_cells(0, 1);
        doc.write_notebook(&nb).unwrap();
        assert_eq!(doc.snapshot().unwrap(), nb);
    }

    #[test]
    fn test_submit_broadcasts_to_subscribers() {
        let doc = LoroNotebookDoc::new();
        let mut rx = doc.subscribe();
        let session = doc.next_session_id();

        doc.submit(session, Box::new(|nb| nb.push_cell(Cell::rich_text("hi"))))
            .unwrap();

        let packet = rx.try_recv().unwrap();
        assert_eq!(packet.sender_id, session);
        assert!(!packet.payload.is_empty());
        assert_eq!(doc.snapshot().unwrap().len(), 1);
    }

    #[test]
    fn test_export_import_converges() {
        let nb = sample_notebook();
        let doc_a = LoroNotebookDoc::with_notebook(&nb).unwrap();
        let doc_b = LoroNotebookDoc::new();

        doc_b.import_update(&doc_a.export_snapshot().unwrap()).unwrap();
        assert_eq!(doc_b.snapshot().unwrap(), nb);
    }
}
