//! Error types for schema compilation and code generation

use thiserror::Error;

/// Result type for crate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Malformed or inconsistent schema description.
///
/// Every variant names the element of the description that triggered it:
/// either a qualified type name (`model::Function`) or a description path
/// (`enums[2]`) when the element has no usable name yet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{element}: missing required key `{key}`")]
    MissingKey { element: String, key: String },

    #[error("{element}: unexpected key `{key}`")]
    UnexpectedKey { element: String, key: String },

    #[error("{element}: invalid value for `{key}`: {reason}")]
    InvalidValue {
        element: String,
        key: String,
        reason: String,
    },

    #[error("{element}: `{key}` must not be empty")]
    EmptyCollection { element: String, key: String },

    #[error("{element}: `{value}` is not a valid identifier for `{key}`")]
    InvalidIdentifier {
        element: String,
        key: String,
        value: String,
    },

    #[error("duplicate definition: {name} (first declared as {first})")]
    DuplicateDefinition { name: String, first: String },

    #[error("{element}: duplicate member `{member}`")]
    DuplicateMember { element: String, member: String },

    #[error("{element}: duplicate field `{field}`")]
    DuplicateField { element: String, field: String },

    #[error("{element}: undefined reference `{name}` in `{field}`{}", suggestion_suffix(.suggestion))]
    UndefinedReference {
        element: String,
        field: String,
        name: String,
        suggestion: Option<String>,
    },

    #[error("{element}: cannot inherit from `{base}`: {reason}")]
    InvalidInheritance {
        element: String,
        base: String,
        reason: String,
    },

    #[error("inheritance cycle involving {element}")]
    InheritanceCycle { element: String },

    #[error("{element}: invalid key field `{field}`: {reason}")]
    InvalidKey {
        element: String,
        field: String,
        reason: String,
    },

    #[error("{element}: field `{field}` {reason}")]
    InvalidUpcast {
        element: String,
        field: String,
        reason: String,
    },

    #[error("invalid root type `{name}`: {reason}")]
    InvalidRootType { name: String, reason: String },
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean `{name}`?)"),
        None => String::new(),
    }
}

impl SchemaError {
    /// The element of the description that triggered this error
    pub fn element(&self) -> &str {
        match self {
            SchemaError::MissingKey { element, .. }
            | SchemaError::UnexpectedKey { element, .. }
            | SchemaError::InvalidValue { element, .. }
            | SchemaError::EmptyCollection { element, .. }
            | SchemaError::InvalidIdentifier { element, .. }
            | SchemaError::DuplicateMember { element, .. }
            | SchemaError::DuplicateField { element, .. }
            | SchemaError::UndefinedReference { element, .. }
            | SchemaError::InvalidInheritance { element, .. }
            | SchemaError::InheritanceCycle { element }
            | SchemaError::InvalidKey { element, .. }
            | SchemaError::InvalidUpcast { element, .. } => element,
            SchemaError::DuplicateDefinition { name, .. }
            | SchemaError::InvalidRootType { name, .. } => name,
        }
    }
}

/// Crate-level errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("failed to persist {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{element}: ordinals starting at {base} do not fit in 32 bits")]
    OrdinalOverflow { element: String, base: u32 },

    #[error("string contains an interior NUL byte at offset {0}")]
    InteriorNul(usize),

    #[error("native string is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_reference_message() {
        let err = SchemaError::UndefinedReference {
            element: "model::Function".to_string(),
            field: "Prototype".to_string(),
            name: "Prototyp".to_string(),
            suggestion: Some("Prototype".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "model::Function: undefined reference `Prototyp` in `Prototype` (did you mean `Prototype`?)"
        );
        assert_eq!(err.element(), "model::Function");
    }

    #[test]
    fn test_schema_error_converts() {
        let err: Error = SchemaError::InheritanceCycle {
            element: "model::A".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Schema(_)));
    }
}
