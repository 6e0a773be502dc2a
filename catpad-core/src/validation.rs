//! Contract with the external validation engine.
//!
//! The engine itself is an external collaborator: declarations go in, in
//! notebook order, and invalidity records come back keyed by declaration
//! identity. Nothing here aborts the editing session; structural invariant
//! violations are data, surfaced at the point of use.

use std::collections::{HashMap, HashSet};

use catpad_types::DeclarationId;

use crate::declaration::{Declaration, TheoryRef};
use crate::notebook::Notebook;

/// One validation failure, keyed by the offending declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidityRecord {
    pub decl: DeclarationId,
    pub reason: String,
}

/// External validation engine contract.
///
/// Declarations are always submitted in notebook order, which is stable and
/// deterministic across recomputes of the same snapshot.
pub trait ValidationEngine {
    fn validate(&self, theory: &TheoryRef, declarations: &[Declaration]) -> Vec<InvalidityRecord>;
}

/// Validation results indexed by declaration id for O(1) per-cell lookup.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    by_decl: HashMap<DeclarationId, Vec<String>>,
}

impl ValidationReport {
    /// Run the engine over the notebook's declarations.
    ///
    /// An absent engine or unselected theory means "no errors", never a
    /// failure: the notebook stays editable while the engine is unavailable.
    pub fn compute(
        engine: Option<&dyn ValidationEngine>,
        theory: Option<&TheoryRef>,
        notebook: &Notebook<Declaration>,
    ) -> Self {
        let (Some(engine), Some(theory)) = (engine, theory) else {
            return Self::default();
        };
        let declarations: Vec<Declaration> = notebook.formal_contents().cloned().collect();
        Self::from_records(engine.validate(theory, &declarations))
    }

    pub fn from_records(records: Vec<InvalidityRecord>) -> Self {
        let mut by_decl: HashMap<DeclarationId, Vec<String>> = HashMap::new();
        for record in records {
            by_decl.entry(record.decl).or_default().push(record.reason);
        }
        Self { by_decl }
    }

    pub fn is_invalid(&self, id: &DeclarationId) -> bool {
        self.by_decl.contains_key(id)
    }

    pub fn errors_for(&self, id: &DeclarationId) -> &[String] {
        self.by_decl.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.by_decl.is_empty()
    }
}

/// Built-in engine that flags dangling morphism endpoints.
///
/// A morphism's `dom`/`cod`, when set, must name an object declaration in
/// the same submission. Anything beyond that (composability, typing against
/// the theory) is the external engine's business.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefChecker;

impl ValidationEngine for RefChecker {
    fn validate(&self, _theory: &TheoryRef, declarations: &[Declaration]) -> Vec<InvalidityRecord> {
        let objects: HashSet<&DeclarationId> = declarations
            .iter()
            .filter_map(|d| d.as_object().map(|ob| &ob.id))
            .collect();

        let mut records = Vec::new();
        for decl in declarations {
            let Some(mor) = decl.as_morphism() else {
                continue;
            };
            for (field, endpoint) in [("dom", &mor.dom), ("cod", &mor.cod)] {
                if let Some(id) = endpoint {
                    if !objects.contains(id) {
                        records.push(InvalidityRecord {
                            decl: mor.id.clone(),
                            reason: format!("{field} does not refer to an object in this notebook"),
                        });
                    }
                }
            }
        }
        records
    }
}
