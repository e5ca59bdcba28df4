//! Identity shared by every schema element

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::SchemaError;

/// Separator between namespace segments and type names
pub const NAMESPACE_SEPARATOR: &str = "::";

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"))
}

/// Whether `s` is a single identifier (no namespace separators)
pub fn is_identifier(s: &str) -> bool {
    identifier_re().is_match(s)
}

/// Whether every `::`-separated segment of `path` is an identifier
pub fn is_namespace_path(path: &str) -> bool {
    !path.is_empty() && path.split(NAMESPACE_SEPARATOR).all(is_identifier)
}

/// Join namespace segments
pub fn qualify(namespace: &str, leaf: &str) -> String {
    format!("{namespace}{NAMESPACE_SEPARATOR}{leaf}")
}

/// Spelling of `name` with trailing underscores removed.
///
/// Emitters escape keywords and reserved names by appending `_`, so two names
/// with the same stem could end up as one identifier.
pub fn spelling_stem(name: &str) -> &str {
    name.trim_end_matches('_')
}

pub(crate) fn check_identifier(element: &str, key: &str, value: &str) -> Result<(), SchemaError> {
    if value.is_empty() {
        return Err(SchemaError::MissingKey {
            element: element.to_string(),
            key: key.to_string(),
        });
    }
    if !is_identifier(value) {
        return Err(SchemaError::InvalidIdentifier {
            element: element.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn check_namespace(element: &str, key: &str, value: &str) -> Result<(), SchemaError> {
    if value.is_empty() {
        return Err(SchemaError::MissingKey {
            element: element.to_string(),
            key: key.to_string(),
        });
    }
    if !is_namespace_path(value) {
        return Err(SchemaError::InvalidIdentifier {
            element: element.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Namespace, user namespace, name and documentation of a definition.
///
/// Qualified names are not stored; [`TypeDefinition`] derives them from
/// these components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    namespace: String,
    user_namespace: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    doc: Option<String>,
}

impl Identity {
    /// Validate and build an identity. `element` labels errors.
    pub fn new(
        element: &str,
        namespace: impl Into<String>,
        user_namespace: impl Into<String>,
        name: impl Into<String>,
        doc: Option<String>,
    ) -> Result<Self, SchemaError> {
        let namespace = namespace.into();
        let user_namespace = user_namespace.into();
        let name = name.into();

        check_identifier(element, "name", &name)?;
        check_namespace(element, "namespace", &namespace)?;
        check_namespace(element, "user_namespace", &user_namespace)?;

        Ok(Self {
            namespace,
            user_namespace,
            name,
            doc,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn user_namespace(&self) -> &str {
        &self.user_namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }
}

/// Capability shared by every definition variant
pub trait TypeDefinition {
    fn identity(&self) -> &Identity;

    /// Fully qualified name of the generated low-level type
    fn qualified_type_name(&self) -> String;

    /// Fully qualified name of the generated user-facing type
    fn qualified_user_type_name(&self) -> String;

    fn name(&self) -> &str {
        self.identity().name()
    }

    fn namespace(&self) -> &str {
        self.identity().namespace()
    }

    fn user_namespace(&self) -> &str {
        self.identity().user_namespace()
    }

    fn doc(&self) -> Option<&str> {
        self.identity().doc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_rules() {
        assert!(is_identifier("Foo"));
        assert!(is_identifier("_private1"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("with-dash"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_namespace_paths() {
        assert!(is_namespace_path("model"));
        assert!(is_namespace_path("model::Kind"));
        assert!(!is_namespace_path("model::"));
        assert!(!is_namespace_path("::model"));
        assert!(!is_namespace_path("model:Kind"));
    }

    #[test]
    fn test_identity_validation() {
        assert!(Identity::new("x", "NS", "NS", "Foo", None).is_ok());

        let err = Identity::new("x", "NS", "NS", "", None).unwrap_err();
        assert!(matches!(err, SchemaError::MissingKey { ref key, .. } if key == "name"));

        let err = Identity::new("x", "", "NS", "Foo", None).unwrap_err();
        assert!(matches!(err, SchemaError::MissingKey { ref key, .. } if key == "namespace"));

        let err = Identity::new("x", "NS", "N S", "Foo", None).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidIdentifier { ref key, .. } if key == "user_namespace"));

        let err = Identity::new("x", "NS", "NS", "Foo.Bar", None).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidIdentifier { .. }));
    }
}
