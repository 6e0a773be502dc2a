//! Active-cell cursor and the cell construction registry.
//!
//! The cursor is local-only state over a notebook whose length can change
//! under it via remote edits. It is deliberately not reconciled against
//! concurrent remote insertions or deletions at lower indices: after such an
//! edit it may point at a different cell than the user last touched. That is
//! a known limitation carried over as-is; corrective behavior needs product
//! guidance first.

use thiserror::Error;

use crate::notebook::{Cell, Notebook};

/// Errors from editor commands that address a specific cell.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("no cell at index {0}")]
    NoSuchCell(usize),
    #[error("cell at index {0} is not a formal cell")]
    NotFormal(usize),
    #[error("cell at index {0} is not a rich-text cell")]
    NotRichText(usize),
    #[error("no cell constructor named {0:?}")]
    UnknownConstructor(String),
}

/// A named way of constructing a new cell.
///
/// The registry decouples the editor from any specific declaration
/// vocabulary: the UI layer gets an ordered list of these and renders them
/// as menu entries or keyboard shortcuts.
pub struct CellConstructor<T> {
    pub name: String,
    pub description: Option<String>,
    pub shortcut: Option<String>,
    construct: Box<dyn Fn() -> Cell<T> + Send + Sync>,
}

impl<T> CellConstructor<T> {
    pub fn new(
        name: impl Into<String>,
        construct: impl Fn() -> Cell<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            shortcut: None,
            construct: Box::new(construct),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_shortcut(mut self, shortcut: impl Into<String>) -> Self {
        self.shortcut = Some(shortcut.into());
        self
    }

    /// Build a fresh cell. Each call mints a new identity.
    pub fn construct(&self) -> Cell<T> {
        (self.construct)()
    }
}

impl<T> std::fmt::Debug for CellConstructor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellConstructor")
            .field("name", &self.name)
            .field("shortcut", &self.shortcut)
            .finish()
    }
}

/// Cursor and command dispatch over a notebook's cell list.
#[derive(Debug)]
pub struct NotebookEditor<T> {
    active: Option<usize>,
    constructors: Vec<CellConstructor<T>>,
}

impl<T> NotebookEditor<T> {
    pub fn new() -> Self {
        Self {
            active: None,
            constructors: Vec::new(),
        }
    }

    pub fn with_constructors(constructors: Vec<CellConstructor<T>>) -> Self {
        Self {
            active: None,
            constructors,
        }
    }

    /// The ordered constructor registry, as handed to the UI layer.
    pub fn constructors(&self) -> &[CellConstructor<T>] {
        &self.constructors
    }

    pub fn constructor_named(&self, name: &str) -> Result<&CellConstructor<T>, EditorError> {
        self.constructors
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| EditorError::UnknownConstructor(name.to_string()))
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// Move the cursor up one cell; no-op at the top or with no cursor.
    pub fn activate_above(&mut self) {
        if let Some(i) = self.active {
            if i > 0 {
                self.active = Some(i - 1);
            }
        }
    }

    /// Move the cursor down one cell; no-op at the bottom. Does not wrap.
    pub fn activate_below(&mut self, len: usize) {
        if let Some(i) = self.active {
            if i + 1 < len {
                self.active = Some(i + 1);
            }
        }
    }

    /// A cell gained focus externally (e.g. a click). Unconditional: this is
    /// the only way focus moves into a specific cell from outside keyboard
    /// navigation.
    pub fn has_focused(&mut self, index: usize) {
        self.active = Some(index);
    }

    /// Where a newly constructed cell goes: just below the cursor, clamped
    /// into the list; the top when nothing is active.
    pub fn insert_position(&self, len: usize) -> usize {
        match self.active {
            Some(i) => (i + 1).min(len),
            None => 0,
        }
    }

    /// Insert a cell after the active one and activate it, so the user can
    /// type into it without an extra click.
    pub fn insert_after_active(&mut self, notebook: &mut Notebook<T>, cell: Cell<T>) -> usize {
        let position = self.insert_position(notebook.len());
        notebook.insert_cell(position, cell);
        self.active = Some(position);
        position
    }

    /// Backspace-at-start: remove the cell at `index` and activate the one
    /// above it (none when deleting at the top).
    pub fn delete_backward(&mut self, notebook: &mut Notebook<T>, index: usize) {
        if notebook.remove_cell(index).is_none() {
            return;
        }
        self.note_removed_backward(index);
    }

    /// Delete-at-end: remove the cell at `index` and keep the cursor at
    /// `index`, which now names the following cell after the list shifted.
    pub fn delete_forward(&mut self, notebook: &mut Notebook<T>, index: usize) {
        if notebook.remove_cell(index).is_none() {
            return;
        }
        self.note_removed_forward(index, notebook.len());
    }

    /// Swap the cell at `index` with the one above; the cursor follows the
    /// moved cell.
    pub fn move_up(&mut self, notebook: &mut Notebook<T>, index: usize) {
        if index == 0 || index >= notebook.len() {
            return;
        }
        notebook.swap_cells(index - 1, index);
        self.note_moved(index, index - 1);
    }

    /// Swap the cell at `index` with the one below; the cursor follows.
    pub fn move_down(&mut self, notebook: &mut Notebook<T>, index: usize) {
        if index + 1 >= notebook.len() {
            return;
        }
        notebook.swap_cells(index, index + 1);
        self.note_moved(index, index + 1);
    }

    /// Cursor rule for a backward deletion whose removal happened elsewhere
    /// (e.g. inside a replicated mutation closure).
    pub fn note_removed_backward(&mut self, index: usize) {
        self.active = index.checked_sub(1);
    }

    /// Cursor rule for a forward deletion; `new_len` is the length after the
    /// removal.
    pub fn note_removed_forward(&mut self, index: usize, new_len: usize) {
        self.active = if new_len == 0 {
            None
        } else {
            Some(index.min(new_len - 1))
        };
    }

    /// Cursor rule for a swap of the cells at `from` and `to`.
    pub fn note_moved(&mut self, from: usize, to: usize) {
        if self.active == Some(from) {
            self.active = Some(to);
        } else if self.active == Some(to) {
            self.active = Some(from);
        }
    }
}

impl<T> Default for NotebookEditor<T> {
    fn default() -> Self {
        Self::new()
    }
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

    fn text_at(nb: &Notebook<()>, i: usize) -> &str {
        nb.cell(i).unwrap().rich_text_content().unwrap()
    }

    #[test]
    fn test_activate_above_at_top_is_noop() {
        let mut editor: NotebookEditor<()> = NotebookEditor::new();
        editor.has_focused(0);
        editor.activate_above();
        assert_eq!(editor.active(), Some(0));
    }

    #[test]
    fn test_activate_below_at_bottom_is_noop() {
        let mut editor: NotebookEditor<()> = NotebookEditor::new();
        editor.has_focused(2);
        editor.activate_below(3);
        assert_eq!(editor.active(), Some(2));
        editor.has_focused(1);
        editor.activate_below(3);
        assert_eq!(editor.active(), Some(2));
    }

    #[test]
    fn test_navigation_noop_without_cursor() {
        let mut editor: NotebookEditor<()> = NotebookEditor::new();
        editor.activate_above();
        editor.activate_below(3);
        assert_eq!(editor.active(), None);
    }

    #[test]
    fn test_insert_into_empty_notebook_activates_zero() {
        let mut editor: NotebookEditor<()> = NotebookEditor::new();
        let mut nb = notebook(&[]);
        let pos = editor.insert_after_active(&mut nb, Cell::rich_text("first"));
        assert_eq!(pos, 0);
        assert_eq!(editor.active(), Some(0));
        assert_eq!(nb.len(), 1);
    }

    #[test]
    fn test_insert_after_active_activates_new_cell() {
        let mut editor: NotebookEditor<()> = NotebookEditor::new();
        let mut nb = notebook(&["a", "b"]);
        editor.has_focused(0);
        let pos = editor.insert_after_active(&mut nb, Cell::rich_text("between"));
        assert_eq!(pos, 1);
        assert_eq!(editor.active(), Some(1));
        assert_eq!(text_at(&nb, 1), "between");
        assert_eq!(text_at(&nb, 2), "b");
    }

    #[test]
    fn test_delete_direction_asymmetry() {
        // [A, B, C] active at 1: backward lands on A, forward lands on C.
        let mut editor: NotebookEditor<()> = NotebookEditor::new();
        let mut nb = notebook(&["A", "B", "C"]);
        editor.has_focused(1);
        editor.delete_backward(&mut nb, 1);
        assert_eq!(editor.active(), Some(0));
        assert_eq!(text_at(&nb, 0), "A");

        let mut editor: NotebookEditor<()> = NotebookEditor::new();
        let mut nb = notebook(&["A", "B", "C"]);
        editor.has_focused(1);
        editor.delete_forward(&mut nb, 1);
        assert_eq!(editor.active(), Some(1));
        assert_eq!(text_at(&nb, 1), "C");
    }

    #[test]
    fn test_delete_backward_at_top_clears_cursor() {
        let mut editor: NotebookEditor<()> = NotebookEditor::new();
        let mut nb = notebook(&["A", "B"]);
        editor.has_focused(0);
        editor.delete_backward(&mut nb, 0);
        assert_eq!(editor.active(), None);
        assert_eq!(nb.len(), 1);
    }

    #[test]
    fn test_delete_last_remaining_cell_clears_cursor() {
        let mut editor: NotebookEditor<()> = NotebookEditor::new();
        let mut nb = notebook(&["only"]);
        editor.has_focused(0);
        editor.delete_forward(&mut nb, 0);
        assert_eq!(editor.active(), None);
        assert!(nb.is_empty());
    }

    #[test]
    fn test_delete_out_of_range_is_noop() {
        let mut editor: NotebookEditor<()> = NotebookEditor::new();
        let mut nb = notebook(&["A"]);
        editor.has_focused(0);
        editor.delete_forward(&mut nb, 5);
        assert_eq!(editor.active(), Some(0));
        assert_eq!(nb.len(), 1);
    }

    #[test]
    fn test_move_carries_cursor() {
        let mut editor: NotebookEditor<()> = NotebookEditor::new();
        let mut nb = notebook(&["A", "B", "C"]);
        editor.has_focused(1);
        editor.move_up(&mut nb, 1);
        assert_eq!(editor.active(), Some(0));
        assert_eq!(text_at(&nb, 0), "B");

        editor.move_down(&mut nb, 0);
        assert_eq!(editor.active(), Some(1));
        assert_eq!(text_at(&nb, 1), "B");
    }

    #[test]
    fn test_constructor_registry_lookup() {
        let editor: NotebookEditor<()> = NotebookEditor::with_constructors(vec![
            CellConstructor::new("Text", || Cell::rich_text("")).with_shortcut("t"),
        ]);
        assert!(editor.constructor_named("Text").is_ok());
        let err = editor.constructor_named("Nope").unwrap_err();
        assert_eq!(err, EditorError::UnknownConstructor("Nope".into()));
    }

    #[test]
    fn test_constructors_mint_fresh_identity() {
        let ctor: CellConstructor<()> = CellConstructor::new("Text", || Cell::rich_text(""));
        let a = ctor.construct();
        let b = ctor.construct();
        assert_ne!(a.id(), b.id());
    }
}
