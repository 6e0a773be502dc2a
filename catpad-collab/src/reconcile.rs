//! Minimal-diff reconciliation of the local store against a snapshot.
//!
//! Cell ids are unique and never reused, so the diff is keyed by id:
//! removals for ids gone from the snapshot, insertions for fresh ids,
//! replacements where an id kept its slot but changed content. Unchanged
//! cells are left in place untouched, which is what keeps re-evaluation
//! cheap downstream — this is the hot path of the whole bridge.

use std::collections::HashSet;

use catpad_core::{Cell, Notebook};
use catpad_types::{CellId, NotebookChange};

/// Patch `store` to equal `snapshot`, returning the patches applied.
///
/// Idempotent: reconciling a store against a snapshot it already equals
/// returns no changes and touches nothing.
pub fn reconcile<T>(store: &mut Notebook<T>, snapshot: &Notebook<T>) -> Vec<NotebookChange>
where
    T: Clone + PartialEq,
{
    let mut changes = Vec::new();

    if store.name != snapshot.name {
        store.name = snapshot.name.clone();
        changes.push(NotebookChange::NameChanged);
    }

    // Removals first, back to front, so surviving indices stay meaningful.
    let keep: HashSet<&CellId> = snapshot.cells.iter().map(Cell::id).collect();
    for i in (0..store.cells.len()).rev() {
        if !keep.contains(store.cells[i].id()) {
            store.cells.remove(i);
            changes.push(NotebookChange::CellRemoved { index: i });
        }
    }

    for (j, cell) in snapshot.cells.iter().enumerate() {
        let id_at_slot = store.cells.get(j).map(|c| c.id() == cell.id()).unwrap_or(false);
        if id_at_slot {
            if store.cells[j] != *cell {
                store.cells[j] = cell.clone();
                changes.push(NotebookChange::CellReplaced { index: j });
            }
            continue;
        }

        // Rows before j are already aligned, so a surviving id sits at k > j.
        let found = store.cells[j..]
            .iter()
            .position(|c| c.id() == cell.id())
            .map(|p| p + j);
        match found {
            Some(k) => {
                let mut moved = store.cells.remove(k);
                changes.push(NotebookChange::CellRemoved { index: k });
                if moved != *cell {
                    moved = cell.clone();
                }
                store.cells.insert(j, moved);
                changes.push(NotebookChange::CellInserted { index: j });
            }
            None => {
                store.cells.insert(j, cell.clone());
                changes.push(NotebookChange::CellInserted { index: j });
            }
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notebook(labels: &[&str]) -> Notebook<()> {
        let mut nb = Notebook::new();
        for label in labels {
            nb.push_cell(Cell::rich_text(*label));
        }
        nb
    }

    fn texts(nb: &Notebook<()>) -> Vec<&str> {
        nb.cells
            .iter()
            .map(|c| c.rich_text_content().unwrap())
            .collect()
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let snapshot = notebook(&["a", "b", "c"]);
        let mut store = Notebook::new();

        let first = reconcile(&mut store, &snapshot);
        assert_eq!(first.len(), 3);
        assert_eq!(store, snapshot);

        let second = reconcile(&mut store, &snapshot);
        assert!(second.is_empty());
        assert_eq!(store, snapshot);
    }

    #[test]
    fn test_reconcile_removal() {
        let mut snapshot = notebook(&["a", "b", "c"]);
        let mut store = snapshot.clone();
        snapshot.remove_cell(1);

        let changes = reconcile(&mut store, &snapshot);
        assert_eq!(changes, vec![NotebookChange::CellRemoved { index: 1 }]);
        assert_eq!(texts(&store), vec!["a", "c"]);
    }

    #[test]
    fn test_reconcile_insertion() {
        let mut snapshot = notebook(&["a", "c"]);
        let mut store = snapshot.clone();
        snapshot.insert_cell(1, Cell::rich_text("b"));

        let changes = reconcile(&mut store, &snapshot);
        assert_eq!(changes, vec![NotebookChange::CellInserted { index: 1 }]);
        assert_eq!(texts(&store), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_reconcile_content_edit_keeps_identity() {
        let mut snapshot = notebook(&["a", "b"]);
        let mut store = snapshot.clone();
        if let Some(Cell::RichText { content, .. }) = snapshot.cell_mut(1) {
            *content = "b2".into();
        }

        let changes = reconcile(&mut store, &snapshot);
        assert_eq!(changes, vec![NotebookChange::CellReplaced { index: 1 }]);
        assert_eq!(store.cell(1).unwrap().id(), snapshot.cell(1).unwrap().id());
    }

    #[test]
    fn test_reconcile_move() {
        let mut snapshot = notebook(&["a", "b", "c"]);
        let mut store = snapshot.clone();
        snapshot.swap_cells(0, 2);

        let changes = reconcile(&mut store, &snapshot);
        assert_eq!(store, snapshot);
        assert_eq!(texts(&store), vec!["c", "b", "a"]);
        assert!(!changes.is_empty());

        // And nothing more to do on a second pass.
        assert!(reconcile(&mut store, &snapshot).is_empty());
    }

    #[test]
    fn test_reconcile_rename() {
        let snapshot = Notebook::<()> {
            name: "renamed".into(),
            cells: Vec::new(),
        };
        let mut store: Notebook<()> = Notebook::new();

        let changes = reconcile(&mut store, &snapshot);
        assert_eq!(changes, vec![NotebookChange::NameChanged]);
        assert_eq!(store.name, "renamed");
    }

    #[test]
    fn test_identical_looking_cells_are_distinct() {
        // Two cells with the same text but different ids must not be merged.
        let mut snapshot = notebook(&["same"]);
        snapshot.push_cell(Cell::rich_text("same"));
        let mut store = Notebook::new();

        let changes = reconcile(&mut store, &snapshot);
        assert_eq!(changes.len(), 2);
        assert_eq!(store.len(), 2);
        assert_ne!(store.cell(0).unwrap().id(), store.cell(1).unwrap().id());
    }
}
