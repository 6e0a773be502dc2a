//! Derived bidirectional map between declaration ids and display names.

use std::collections::HashMap;

use catpad_types::DeclarationId;

use crate::declaration::Declaration;
use crate::notebook::Notebook;

/// Bidirectional name/id index over a notebook's object declarations.
///
/// Derived state, never stored: rebuilt by a full scan whenever notebook
/// content changes, never patched incrementally. Name collisions are
/// allowed; `resolve` picks the first declaration in cell order, and
/// `candidates` exposes the full list so callers can warn about ambiguity.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    by_id: HashMap<DeclarationId, String>,
    by_name: HashMap<String, Vec<DeclarationId>>,
}

impl NameIndex {
    /// Build the index from a notebook snapshot, scanning cells in order.
    pub fn build(notebook: &Notebook<Declaration>) -> Self {
        let mut index = Self::default();
        for decl in notebook.formal_contents() {
            let Declaration::Object(ob) = decl else {
                continue;
            };
            if ob.name.is_empty() {
                continue;
            }
            index.by_id.insert(ob.id.clone(), ob.name.clone());
            index
                .by_name
                .entry(ob.name.clone())
                .or_default()
                .push(ob.id.clone());
        }
        index
    }

    pub fn name_of(&self, id: &DeclarationId) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    /// Resolve a typed name to a declaration id.
    ///
    /// Deterministic tie-break on collision: the first-inserted declaration
    /// wins, always.
    pub fn resolve(&self, name: &str) -> Option<&DeclarationId> {
        self.candidates(name).first()
    }

    /// All declarations carrying this name, in cell order.
    pub fn candidates(&self, name: &str) -> &[DeclarationId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.candidates(name).len() > 1
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
