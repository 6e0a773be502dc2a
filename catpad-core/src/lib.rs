//! # catpad-core
//!
//! Core library for the catpad formal notebook editor.
//!
//! This crate provides the document model (notebooks of rich-text and formal
//! cells), the declaration vocabulary, the derived name index and reference
//! resolution, the validation-engine contract, and the active-cell editor
//! controller. Everything here is pure data and synchronous logic; the
//! replication bridge lives in catpad-collab.

pub mod declaration;
pub mod editor;
pub mod name_index;
pub mod notebook;
pub mod reference;
pub mod validation;

pub use declaration::{Declaration, MorTypeRef, MorphismDecl, ObTypeRef, ObjectDecl, TheoryRef};
pub use editor::{CellConstructor, EditorError, NotebookEditor};
pub use name_index::NameIndex;
pub use notebook::{Cell, Notebook};
pub use reference::{RefInput, RefStatus};
pub use validation::{InvalidityRecord, RefChecker, ValidationEngine, ValidationReport};
