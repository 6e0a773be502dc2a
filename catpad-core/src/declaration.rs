//! Declaration vocabulary for formal cells: objects and morphisms.

use catpad_types::DeclarationId;
use serde::{Deserialize, Serialize};

/// Reference to an object type in the ambient theory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObTypeRef(pub String);

impl ObTypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Reference to a morphism type in the ambient theory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MorTypeRef(pub String);

impl MorTypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Names the external theory a notebook's declarations are validated against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TheoryRef(pub String);

impl TheoryRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// An object declaration: a named generator of some object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDecl {
    pub id: DeclarationId,
    pub name: String,
    pub ob_type: ObTypeRef,
}

impl ObjectDecl {
    pub fn new(name: impl Into<String>, ob_type: ObTypeRef) -> Self {
        Self {
            id: DeclarationId::fresh(),
            name: name.into(),
            ob_type,
        }
    }
}

/// A morphism declaration with optional domain and codomain references.
///
/// `dom`/`cod`, when set, should name an object declaration in the same
/// notebook. That is not enforced here: concurrent edits can transiently
/// break it, so danglers are representable and caught by validation and
/// reference resolution instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphismDecl {
    pub id: DeclarationId,
    pub name: String,
    pub mor_type: MorTypeRef,
    #[serde(default)]
    pub dom: Option<DeclarationId>,
    #[serde(default)]
    pub cod: Option<DeclarationId>,
}

impl MorphismDecl {
    pub fn new(name: impl Into<String>, mor_type: MorTypeRef) -> Self {
        Self {
            id: DeclarationId::fresh(),
            name: name.into(),
            mor_type,
            dom: None,
            cod: None,
        }
    }
}

/// A formal declaration, tagged by kind.
///
/// Consumers match exhaustively; there is no open hierarchy to extend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "lowercase")]
pub enum Declaration {
    Object(ObjectDecl),
    Morphism(MorphismDecl),
}

impl Declaration {
    pub fn id(&self) -> &DeclarationId {
        match self {
            Declaration::Object(ob) => &ob.id,
            Declaration::Morphism(mor) => &mor.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Declaration::Object(ob) => &ob.name,
            Declaration::Morphism(mor) => &mor.name,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        match self {
            Declaration::Object(ob) => ob.name = name.into(),
            Declaration::Morphism(mor) => mor.name = name.into(),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectDecl> {
        match self {
            Declaration::Object(ob) => Some(ob),
            Declaration::Morphism(_) => None,
        }
    }

    pub fn as_morphism(&self) -> Option<&MorphismDecl> {
        match self {
            Declaration::Morphism(mor) => Some(mor),
            Declaration::Object(_) => None,
        }
    }

    pub fn as_morphism_mut(&mut self) -> Option<&mut MorphismDecl> {
        match self {
            Declaration::Morphism(mor) => Some(mor),
            Declaration::Object(_) => None,
        }
    }
}
