//! Per-input reference resolution: typed text against the name index.

use catpad_types::DeclarationId;

use crate::name_index::NameIndex;
use crate::validation::ValidationReport;

/// Validity of a single reference-typing input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefStatus {
    /// The field is resolved (or deliberately empty)
    Valid,
    /// Typed text does not currently name any declaration
    Incomplete,
    /// Resolves structurally but fails semantic validation
    Invalid,
}

/// Local state for one reference-typing input, e.g. a morphism's domain
/// field.
///
/// The displayed text is independent of the bound target: an in-progress
/// keystroke that matches nothing must not destroy a previously valid
/// reference. The target itself lives in the declaration; this type only
/// routes edits into it.
#[derive(Debug, Clone)]
pub struct RefInput {
    text: String,
    status: RefStatus,
}

impl RefInput {
    /// Initialize the displayed text from the currently bound target.
    pub fn new(target: Option<&DeclarationId>, index: &NameIndex) -> Self {
        Self {
            text: display_text(target, index),
            status: RefStatus::Valid,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> RefStatus {
        self.status
    }

    /// Re-initialize the displayed text after the target changed externally
    /// (a remote edit or a programmatic rebind).
    pub fn sync_target(&mut self, target: Option<&DeclarationId>, index: &NameIndex) {
        self.text = display_text(target, index);
        self.status = RefStatus::Valid;
    }

    /// Apply one text edit.
    ///
    /// Empty text clears the target. Text naming at least one declaration
    /// binds the first match (deterministic tie-break) and keeps the typed
    /// text as-is. Non-empty text with no match leaves the target untouched
    /// and marks the field incomplete.
    pub fn edit(
        &mut self,
        text: impl Into<String>,
        target: &mut Option<DeclarationId>,
        index: &NameIndex,
    ) {
        let text = text.into();
        if text.is_empty() {
            *target = None;
            self.status = RefStatus::Valid;
        } else if let Some(id) = index.resolve(&text) {
            *target = Some(id.clone());
            self.status = RefStatus::Valid;
        } else {
            self.status = RefStatus::Incomplete;
        }
        self.text = text;
    }

    /// Fold in externally supplied validation results for the owning
    /// declaration. Incomplete from typing wins over invalid from the
    /// engine: the local keystroke is fresher than the last validation run.
    pub fn apply_validation(&mut self, report: &ValidationReport, owner: &DeclarationId) {
        if self.status == RefStatus::Valid && report.is_invalid(owner) {
            self.status = RefStatus::Invalid;
        }
    }
}

fn display_text(target: Option<&DeclarationId>, index: &NameIndex) -> String {
    target
        .and_then(|id| index.name_of(id))
        .unwrap_or_default()
        .to_string()
}
