//! Schema data model
//!
//! Definitions are a closed set of variants: every consumer matches on
//! [`Definition`] exhaustively.

pub mod definition;
pub(crate) mod description;
pub mod enumeration;
pub mod structure;

use serde::Serialize;
use serde_json::Value;

pub use definition::{spelling_stem, Identity, TypeDefinition};
pub use enumeration::{EnumDefinition, EnumMember};
pub use structure::{Field, FieldType, Primitive, SequenceKind, StructDefinition, TypeRef};

/// Index of a definition inside the [`crate::Schema`] that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DefId(usize);

impl DefId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Any schema element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Definition {
    Struct(StructDefinition),
    Enum(EnumDefinition),
}

impl Definition {
    pub fn as_struct(&self) -> Option<&StructDefinition> {
        match self {
            Definition::Struct(def) => Some(def),
            Definition::Enum(_) => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumDefinition> {
        match self {
            Definition::Enum(def) => Some(def),
            Definition::Struct(_) => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Definition::Struct(_) => "struct",
            Definition::Enum(_) => "enum",
        }
    }

    /// Re-serialize to the description format
    pub fn to_description(&self, type_name: impl Fn(&TypeRef) -> String) -> Value {
        match self {
            Definition::Struct(def) => def.to_description(type_name),
            Definition::Enum(def) => def.to_description(),
        }
    }
}

impl TypeDefinition for Definition {
    fn identity(&self) -> &Identity {
        match self {
            Definition::Struct(def) => def.identity(),
            Definition::Enum(def) => def.identity(),
        }
    }

    fn qualified_type_name(&self) -> String {
        match self {
            Definition::Struct(def) => def.qualified_type_name(),
            Definition::Enum(def) => def.qualified_type_name(),
        }
    }

    fn qualified_user_type_name(&self) -> String {
        match self {
            Definition::Struct(def) => def.qualified_user_type_name(),
            Definition::Enum(def) => def.qualified_user_type_name(),
        }
    }
}
