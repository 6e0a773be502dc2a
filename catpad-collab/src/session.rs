//! One user's editing surface over a shared notebook.
//!
//! Composes the bridge, the active-cell editor controller, and the derived
//! state (name index, validation report) into a single type. Every command
//! issues exactly one scoped mutation and then recomputes derived state from
//! the fresh snapshot; derived state is always a pure function of the latest
//! store, never an incrementally patched cache.

use std::sync::Arc;

use anyhow::Result;

use catpad_core::{
    Cell, CellConstructor, Declaration, EditorError, MorTypeRef, MorphismDecl, NameIndex,
    Notebook, NotebookEditor, ObTypeRef, ObjectDecl, RefInput, TheoryRef, ValidationEngine,
    ValidationReport,
};
use catpad_types::NotebookChange;

use crate::bridge::SyncBridge;
use crate::crdt::DocHandle;

/// Which endpoint of a morphism a reference edit targets.
#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Dom,
    Cod,
}

pub struct NotebookSession {
    bridge: SyncBridge,
    editor: NotebookEditor<Declaration>,
    index: NameIndex,
    report: ValidationReport,
    engine: Option<Box<dyn ValidationEngine + Send + Sync>>,
    theory: Option<TheoryRef>,
}

impl NotebookSession {
    /// Connect to a replicated document and load its current snapshot.
    pub fn connect(
        handle: Arc<dyn DocHandle>,
        constructors: Vec<CellConstructor<Declaration>>,
    ) -> Result<Self> {
        let mut bridge = SyncBridge::new(handle);
        bridge.initialize()?;
        let mut session = Self {
            bridge,
            editor: NotebookEditor::with_constructors(constructors),
            index: NameIndex::default(),
            report: ValidationReport::default(),
            engine: None,
            theory: None,
        };
        session.refresh_derived();
        Ok(session)
    }

    /// Select the validation engine and theory. Until both are set, every
    /// declaration reports as error-free.
    pub fn set_engine(
        &mut self,
        engine: Box<dyn ValidationEngine + Send + Sync>,
        theory: TheoryRef,
    ) {
        self.engine = Some(engine);
        self.theory = Some(theory);
        self.refresh_derived();
    }

    pub fn notebook(&self) -> &Notebook<Declaration> {
        self.bridge.store()
    }

    pub fn name_index(&self) -> &NameIndex {
        &self.index
    }

    pub fn validation(&self) -> &ValidationReport {
        &self.report
    }

    /// The ordered cell-constructor registry, for the UI layer.
    pub fn constructors(&self) -> &[CellConstructor<Declaration>] {
        self.editor.constructors()
    }

    pub fn active(&self) -> Option<usize> {
        self.editor.active()
    }

    fn ensure_cell(&self, index: usize) -> Result<(), EditorError> {
        if index < self.bridge.store().len() {
            Ok(())
        } else {
            Err(EditorError::NoSuchCell(index))
        }
    }

    fn refresh_derived(&mut self) {
        let store = self.bridge.store();
        self.index = NameIndex::build(store);
        let engine = self.engine.as_deref().map(|e| e as &dyn ValidationEngine);
        self.report = ValidationReport::compute(engine, self.theory.as_ref(), store);
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    pub fn activate_above(&mut self) {
        self.editor.activate_above();
    }

    pub fn activate_below(&mut self) {
        let len = self.bridge.store().len();
        self.editor.activate_below(len);
    }

    pub fn has_focused(&mut self, index: usize) {
        self.editor.has_focused(index);
    }

    // -------------------------------------------------------------------------
    // Construction and deletion
    // -------------------------------------------------------------------------

    /// Insert a cell below the active one and activate it.
    pub fn insert_after_active(&mut self, cell: Cell<Declaration>) -> Result<usize> {
        let position = self.editor.insert_position(self.bridge.store().len());
        self.bridge.mutate(move |nb| nb.insert_cell(position, cell))?;
        self.editor.has_focused(position);
        self.refresh_derived();
        Ok(position)
    }

    /// Build a cell through the named constructor and insert it.
    pub fn construct_cell(&mut self, name: &str) -> Result<usize> {
        let cell = self.editor.constructor_named(name)?.construct();
        self.insert_after_active(cell)
    }

    /// Backspace-at-start: delete the cell and activate the one above.
    pub fn delete_backward(&mut self, index: usize) -> Result<()> {
        self.ensure_cell(index)?;
        self.bridge.mutate(move |nb| {
            nb.remove_cell(index);
        })?;
        self.editor.note_removed_backward(index);
        self.refresh_derived();
        Ok(())
    }

    /// Delete-at-end: delete the cell and keep the cursor on the follower.
    pub fn delete_forward(&mut self, index: usize) -> Result<()> {
        self.ensure_cell(index)?;
        self.bridge.mutate(move |nb| {
            nb.remove_cell(index);
        })?;
        let new_len = self.bridge.store().len();
        self.editor.note_removed_forward(index, new_len);
        self.refresh_derived();
        Ok(())
    }

    /// Swap the cell with the one above; no-op at the top.
    pub fn move_up(&mut self, index: usize) -> Result<()> {
        if index == 0 || index >= self.bridge.store().len() {
            return Ok(());
        }
        self.bridge.mutate(move |nb| nb.swap_cells(index - 1, index))?;
        self.editor.note_moved(index, index - 1);
        self.refresh_derived();
        Ok(())
    }

    /// Swap the cell with the one below; no-op at the bottom.
    pub fn move_down(&mut self, index: usize) -> Result<()> {
        if index + 1 >= self.bridge.store().len() {
            return Ok(());
        }
        self.bridge.mutate(move |nb| nb.swap_cells(index, index + 1))?;
        self.editor.note_moved(index, index + 1);
        self.refresh_derived();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Content edits
    // -------------------------------------------------------------------------

    /// Replace the text of a rich-text cell.
    pub fn edit_rich_text(&mut self, index: usize, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        match self.bridge.store().cell(index) {
            None => return Err(EditorError::NoSuchCell(index).into()),
            Some(cell) if cell.rich_text_content().is_none() => {
                return Err(EditorError::NotRichText(index).into())
            }
            Some(_) => {}
        }
        self.bridge.mutate(move |nb| {
            if let Some(Cell::RichText { content, .. }) = nb.cell_mut(index) {
                *content = text;
            }
        })?;
        self.refresh_derived();
        Ok(())
    }

    /// Rename the declaration in a formal cell.
    pub fn rename_declaration(&mut self, index: usize, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        match self.bridge.store().cell(index) {
            None => return Err(EditorError::NoSuchCell(index).into()),
            Some(cell) if !cell.is_formal() => return Err(EditorError::NotFormal(index).into()),
            Some(_) => {}
        }
        self.bridge.mutate(move |nb| {
            if let Some(decl) = nb.cell_mut(index).and_then(Cell::formal_content_mut) {
                decl.set_name(name);
            }
        })?;
        self.refresh_derived();
        Ok(())
    }

    /// Route a text edit of a morphism's domain field through the resolver.
    pub fn edit_dom(&mut self, index: usize, input: &mut RefInput, text: &str) -> Result<()> {
        self.edit_endpoint(index, input, text, Endpoint::Dom)
    }

    /// Route a text edit of a morphism's codomain field through the resolver.
    pub fn edit_cod(&mut self, index: usize, input: &mut RefInput, text: &str) -> Result<()> {
        self.edit_endpoint(index, input, text, Endpoint::Cod)
    }

    fn edit_endpoint(
        &mut self,
        index: usize,
        input: &mut RefInput,
        text: &str,
        which: Endpoint,
    ) -> Result<()> {
        let mor = self
            .bridge
            .store()
            .cell(index)
            .ok_or(EditorError::NoSuchCell(index))?
            .formal_content()
            .and_then(Declaration::as_morphism)
            .ok_or(EditorError::NotFormal(index))?;
        let owner = mor.id.clone();
        let mut target = match which {
            Endpoint::Dom => mor.dom.clone(),
            Endpoint::Cod => mor.cod.clone(),
        };

        input.edit(text, &mut target, &self.index);

        self.bridge.mutate(move |nb| {
            if let Some(mor) = nb
                .cell_mut(index)
                .and_then(Cell::formal_content_mut)
                .and_then(Declaration::as_morphism_mut)
            {
                match which {
                    Endpoint::Dom => mor.dom = target,
                    Endpoint::Cod => mor.cod = target,
                }
            }
        })?;
        self.refresh_derived();
        input.apply_validation(&self.report, &owner);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Remote changes
    // -------------------------------------------------------------------------

    /// Drain pending remote changes and recompute derived state if anything
    /// landed. The local cursor is left alone even when remote edits shift
    /// indices under it.
    pub fn sync(&mut self) -> Result<Vec<NotebookChange>> {
        let changes = self.bridge.pump()?;
        if !changes.is_empty() {
            self.refresh_derived();
        }
        Ok(changes)
    }

    /// Merge an update ferried from another replica.
    pub fn apply_remote(&mut self, payload: &[u8]) -> Result<Vec<NotebookChange>> {
        let changes = self.bridge.apply_remote(payload)?;
        if !changes.is_empty() {
            self.refresh_derived();
        }
        Ok(changes)
    }
}

/// The standard constructor registry: prose, objects, and morphisms of the
/// given types.
pub fn standard_constructors(
    ob_type: ObTypeRef,
    mor_type: MorTypeRef,
) -> Vec<CellConstructor<Declaration>> {
    vec![
        CellConstructor::new("Text", || Cell::rich_text(""))
            .with_description("Free-form text")
            .with_shortcut("t"),
        CellConstructor::new("Object", move || {
            Cell::formal(Declaration::Object(ObjectDecl::new("", ob_type.clone())))
        })
        .with_description("Object declaration")
        .with_shortcut("o"),
        CellConstructor::new("Morphism", move || {
            Cell::formal(Declaration::Morphism(MorphismDecl::new(
                "",
                mor_type.clone(),
            )))
        })
        .with_description("Morphism declaration")
        .with_shortcut("m"),
    ]
}
