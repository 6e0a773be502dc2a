//! Notebook and cell model: ordered cells mixing prose with typed payloads.

use catpad_types::CellId;
use serde::{Deserialize, Serialize};

/// A single block in a notebook: free-form text or a formally typed payload.
///
/// The tag is fixed at creation. A cell changes kind by being replaced, never
/// retagged, so an id always names exactly one content shape. Cells are
/// distinguished by id, not by structure: two content-identical cells with
/// different ids are different entities, which is what diffing and cursor
/// navigation rely on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum Cell<T> {
    RichText { id: CellId, content: String },
    Formal { id: CellId, content: T },
}

impl<T> Cell<T> {
    /// Create a rich-text cell with a fresh id.
    pub fn rich_text(content: impl Into<String>) -> Self {
        Cell::RichText {
            id: CellId::fresh(),
            content: content.into(),
        }
    }

    /// Create a formal cell with a fresh id.
    pub fn formal(content: T) -> Self {
        Cell::Formal {
            id: CellId::fresh(),
            content,
        }
    }

    pub fn id(&self) -> &CellId {
        match self {
            Cell::RichText { id, .. } | Cell::Formal { id, .. } => id,
        }
    }

    pub fn is_formal(&self) -> bool {
        matches!(self, Cell::Formal { .. })
    }

    pub fn formal_content(&self) -> Option<&T> {
        match self {
            Cell::Formal { content, .. } => Some(content),
            Cell::RichText { .. } => None,
        }
    }

    pub fn formal_content_mut(&mut self) -> Option<&mut T> {
        match self {
            Cell::Formal { content, .. } => Some(content),
            Cell::RichText { .. } => None,
        }
    }

    pub fn rich_text_content(&self) -> Option<&str> {
        match self {
            Cell::RichText { content, .. } => Some(content),
            Cell::Formal { .. } => None,
        }
    }
}

/// A named, ordered sequence of cells.
///
/// Pure data: no validation, no side effects. Order is meaningful for
/// rendering and for the deterministic submission order to the validation
/// engine, but never for validity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notebook<T> {
    pub name: String,
    pub cells: Vec<Cell<T>>,
}

impl<T> Notebook<T> {
    /// Create an empty, unnamed notebook.
    pub fn new() -> Self {
        Self {
            name: String::new(),
            cells: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, index: usize) -> Option<&Cell<T>> {
        self.cells.get(index)
    }

    pub fn cell_mut(&mut self, index: usize) -> Option<&mut Cell<T>> {
        self.cells.get_mut(index)
    }

    pub fn push_cell(&mut self, cell: Cell<T>) {
        self.cells.push(cell);
    }

    /// Insert at `index`, clamped to the current length.
    pub fn insert_cell(&mut self, index: usize, cell: Cell<T>) {
        let index = index.min(self.cells.len());
        self.cells.insert(index, cell);
    }

    /// Remove the cell at `index`, if it exists.
    pub fn remove_cell(&mut self, index: usize) -> Option<Cell<T>> {
        if index < self.cells.len() {
            Some(self.cells.remove(index))
        } else {
            None
        }
    }

    /// Swap two cells; out-of-range indices are a no-op.
    pub fn swap_cells(&mut self, a: usize, b: usize) {
        if a < self.cells.len() && b < self.cells.len() {
            self.cells.swap(a, b);
        }
    }

    /// Formal payloads in cell order.
    pub fn formal_contents(&self) -> impl Iterator<Item = &T> {
        self.cells.iter().filter_map(Cell::formal_content)
    }
}

impl<T> Default for Notebook<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_identity_not_structural() {
        let a = Cell::<()>::rich_text("same");
        let b = Cell::<()>::rich_text("same");
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
    }

    #[test]
    fn test_insert_clamps_to_length() {
        let mut nb: Notebook<()> = Notebook::new();
        nb.insert_cell(99, Cell::rich_text("first"));
        assert_eq!(nb.len(), 1);
        assert_eq!(nb.cell(0).unwrap().rich_text_content(), Some("first"));
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut nb: Notebook<()> = Notebook::new();
        nb.push_cell(Cell::rich_text("only"));
        assert!(nb.remove_cell(1).is_none());
        assert!(nb.remove_cell(0).is_some());
        assert!(nb.is_empty());
    }

    #[test]
    fn test_formal_contents_in_order() {
        let mut nb: Notebook<u32> = Notebook::new();
        nb.push_cell(Cell::formal(1));
        nb.push_cell(Cell::rich_text("prose"));
        nb.push_cell(Cell::formal(2));
        let values: Vec<u32> = nb.formal_contents().copied().collect();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn test_cell_serde_tagged() {
        let cell: Cell<u32> = Cell::rich_text("hello");
        let json = serde_json::to_string(&cell).unwrap();
        assert!(json.contains("\"tag\":\"rich_text\""));
        let back: Cell<u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(cell, back);
    }
}
