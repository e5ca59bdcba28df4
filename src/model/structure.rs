//! Struct definitions: records with typed fields, optional base and key

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::definition::{check_identifier, qualify, spelling_stem, Identity, TypeDefinition};
use super::description::Mapping;
use super::DefId;
use crate::error::SchemaError;

/// Built-in scalar types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Bool,
    String,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
}

impl Primitive {
    pub const ALL: [Primitive; 12] = [
        Primitive::Bool,
        Primitive::String,
        Primitive::Int8,
        Primitive::Int16,
        Primitive::Int32,
        Primitive::Int64,
        Primitive::Uint8,
        Primitive::Uint16,
        Primitive::Uint32,
        Primitive::Uint64,
        Primitive::Float32,
        Primitive::Float64,
    ];

    /// Name used in schema descriptions
    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::String => "string",
            Primitive::Int8 => "int8",
            Primitive::Int16 => "int16",
            Primitive::Int32 => "int32",
            Primitive::Int64 => "int64",
            Primitive::Uint8 => "uint8",
            Primitive::Uint16 => "uint16",
            Primitive::Uint32 => "uint32",
            Primitive::Uint64 => "uint64",
            Primitive::Float32 => "float32",
            Primitive::Float64 => "float64",
        }
    }

    pub fn is_integer(&self) -> bool {
        self.integer_bounds().is_some()
    }

    /// Inclusive range of an integer type
    pub fn integer_bounds(&self) -> Option<(i128, i128)> {
        let bounds = match self {
            Primitive::Int8 => (i8::MIN.into(), i8::MAX.into()),
            Primitive::Int16 => (i16::MIN.into(), i16::MAX.into()),
            Primitive::Int32 => (i32::MIN.into(), i32::MAX.into()),
            Primitive::Int64 => (i64::MIN.into(), i64::MAX.into()),
            Primitive::Uint8 => (0, u8::MAX.into()),
            Primitive::Uint16 => (0, u16::MAX.into()),
            Primitive::Uint32 => (0, u32::MAX.into()),
            Primitive::Uint64 => (0, u64::MAX.into()),
            Primitive::Bool | Primitive::String | Primitive::Float32 | Primitive::Float64 => return None,
        };
        Some(bounds)
    }
}

impl FromStr for Primitive {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Primitive::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to the type of a field or to a base struct.
///
/// `Unresolved` only exists between the two construction passes of a
/// [`crate::Schema`]; a built schema contains `Primitive` and `Definition`
/// references only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeRef {
    Primitive(Primitive),
    Unresolved(String),
    Definition(DefId),
}

impl TypeRef {
    fn parse(name: &str) -> Self {
        match name.parse::<Primitive>() {
            Ok(primitive) => TypeRef::Primitive(primitive),
            Err(()) => TypeRef::Unresolved(name.to_string()),
        }
    }

    pub fn definition(&self) -> Option<DefId> {
        match self {
            TypeRef::Definition(id) => Some(*id),
            _ => None,
        }
    }
}

/// Container used for sequence fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SequenceKind {
    /// Elements are keyed; producers keep them ordered by key
    SortedVector,
    /// Insertion-ordered
    Vector,
}

impl SequenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceKind::SortedVector => "SortedVector",
            SequenceKind::Vector => "Vector",
        }
    }
}

impl FromStr for SequenceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SortedVector" => Ok(SequenceKind::SortedVector),
            "Vector" | "vector" => Ok(SequenceKind::Vector),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FieldType {
    Scalar(TypeRef),
    Sequence { kind: SequenceKind, element: TypeRef },
}

impl FieldType {
    /// The referenced element type, for scalars and sequences alike
    pub fn element(&self) -> &TypeRef {
        match self {
            FieldType::Scalar(ty) => ty,
            FieldType::Sequence { element, .. } => element,
        }
    }

    pub(crate) fn element_mut(&mut self) -> &mut TypeRef {
        match self {
            FieldType::Scalar(ty) => ty,
            FieldType::Sequence { element, .. } => element,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, FieldType::Sequence { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    pub optional: bool,
    /// The value is any concrete descendant of an abstract struct
    pub upcastable: bool,
}

impl Field {
    const KEYS: &'static [&'static str] = &["name", "type", "sequence", "doc", "optional", "upcastable"];
    const SEQUENCE_KEYS: &'static [&'static str] = &["type", "elementType"];

    pub(crate) fn parse(value: &Value, element: &str) -> Result<Self, SchemaError> {
        let mut mapping = Mapping::new(value, element)?;
        mapping.deny_unknown_keys(Self::KEYS)?;

        let name = mapping.required_str("name")?;
        check_identifier(mapping.element(), "name", name)?;
        mapping.relabel(format!("{element} ({name})"));

        let ty = match (mapping.contains("type"), mapping.contains("sequence")) {
            (true, true) => {
                return Err(SchemaError::InvalidValue {
                    element: mapping.element().to_string(),
                    key: "sequence".to_string(),
                    reason: "`type` and `sequence` are mutually exclusive".to_string(),
                })
            }
            (false, false) => {
                return Err(SchemaError::MissingKey {
                    element: mapping.element().to_string(),
                    key: "type".to_string(),
                })
            }
            (true, false) => FieldType::Scalar(TypeRef::parse(mapping.required_str("type")?)),
            (false, true) => {
                let label = format!("{}.sequence", mapping.element());
                let sequence = mapping
                    .optional_mapping("sequence", label)?
                    .ok_or_else(|| SchemaError::MissingKey {
                        element: mapping.element().to_string(),
                        key: "sequence".to_string(),
                    })?;
                sequence.deny_unknown_keys(Self::SEQUENCE_KEYS)?;
                let kind_name = sequence.required_str("type")?;
                let kind = kind_name.parse::<SequenceKind>().map_err(|()| SchemaError::InvalidValue {
                    element: sequence.element().to_string(),
                    key: "type".to_string(),
                    reason: format!("unknown sequence kind `{kind_name}`"),
                })?;
                FieldType::Sequence {
                    kind,
                    element: TypeRef::parse(sequence.required_str("elementType")?),
                }
            }
        };

        let optional = mapping.flag("optional")?;
        if optional && ty.is_sequence() {
            return Err(SchemaError::InvalidValue {
                element: mapping.element().to_string(),
                key: "optional".to_string(),
                reason: "sequences cannot be optional".to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            ty,
            doc: mapping.optional_str("doc")?.map(str::to_string),
            optional,
            upcastable: mapping.flag("upcastable")?,
        })
    }
}

/// A record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructDefinition {
    #[serde(flatten)]
    identity: Identity,
    fields: Vec<Field>,
    key: Vec<String>,
    #[serde(rename = "abstract")]
    is_abstract: bool,
    inherits: Option<TypeRef>,
}

impl StructDefinition {
    const KEYS: &'static [&'static str] = &["name", "doc", "fields", "key", "abstract", "inherits"];

    /// Parse `{name, fields?, key?, abstract?, inherits?, doc?}`.
    ///
    /// Field types and the base are left unresolved; resolving them is the
    /// schema's job.
    pub fn from_description(
        value: &Value,
        default_namespace: &str,
        user_namespace: &str,
    ) -> Result<Self, SchemaError> {
        Self::parse(value, default_namespace, user_namespace, "struct")
    }

    pub(crate) fn parse(
        value: &Value,
        default_namespace: &str,
        user_namespace: &str,
        element: &str,
    ) -> Result<Self, SchemaError> {
        let mut mapping = Mapping::new(value, element)?;
        mapping.deny_unknown_keys(Self::KEYS)?;

        let name = mapping.required_str("name")?;
        check_identifier(mapping.element(), "name", name)?;
        if name.parse::<Primitive>().is_ok() {
            return Err(SchemaError::InvalidIdentifier {
                element: mapping.element().to_string(),
                key: "name".to_string(),
                value: name.to_string(),
            });
        }
        mapping.relabel(qualify(default_namespace, name));

        let doc = mapping.optional_str("doc")?.map(str::to_string);
        let identity = Identity::new(mapping.element(), default_namespace, user_namespace, name, doc)?;

        let fields = mapping
            .optional_seq("fields")?
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(i, field)| Field::parse(field, &format!("{}.fields[{i}]", mapping.element())))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(spelling_stem(&field.name)) {
                return Err(SchemaError::DuplicateField {
                    element: mapping.element().to_string(),
                    field: field.name.clone(),
                });
            }
        }

        let mut key = Vec::new();
        for name in mapping.optional_str_list("key")? {
            if key.iter().any(|k| k == name) {
                return Err(SchemaError::InvalidKey {
                    element: mapping.element().to_string(),
                    field: name.to_string(),
                    reason: "listed twice".to_string(),
                });
            }
            key.push(name.to_string());
        }

        Ok(Self {
            identity,
            fields,
            key,
            is_abstract: mapping.flag("abstract")?,
            inherits: mapping.optional_str("inherits")?.map(TypeRef::parse),
        })
    }

    /// Own fields, in declaration order (inherited fields excluded)
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of the fields forming this struct's own key
    pub fn key(&self) -> &[String] {
        &self.key
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn inherits(&self) -> Option<&TypeRef> {
        self.inherits.as_ref()
    }

    pub(crate) fn inherits_mut(&mut self) -> Option<&mut TypeRef> {
        self.inherits.as_mut()
    }

    /// Resolved base struct
    pub fn base(&self) -> Option<DefId> {
        self.inherits.as_ref().and_then(TypeRef::definition)
    }

    /// Re-serialize to the description format. `type_name` renders resolved
    /// references.
    pub fn to_description(&self, type_name: impl Fn(&TypeRef) -> String) -> Value {
        let mut map = Map::new();
        map.insert("name".to_string(), json!(self.name()));
        if let Some(doc) = self.doc() {
            map.insert("doc".to_string(), json!(doc));
        }
        if self.is_abstract {
            map.insert("abstract".to_string(), json!(true));
        }
        if let Some(base) = &self.inherits {
            map.insert("inherits".to_string(), json!(type_name(base)));
        }
        if !self.key.is_empty() {
            map.insert("key".to_string(), json!(self.key));
        }

        let fields = self
            .fields
            .iter()
            .map(|field| {
                let mut f = Map::new();
                f.insert("name".to_string(), json!(field.name));
                match &field.ty {
                    FieldType::Scalar(ty) => {
                        f.insert("type".to_string(), json!(type_name(ty)));
                    }
                    FieldType::Sequence { kind, element } => {
                        f.insert(
                            "sequence".to_string(),
                            json!({"type": kind.as_str(), "elementType": type_name(element)}),
                        );
                    }
                }
                if let Some(doc) = &field.doc {
                    f.insert("doc".to_string(), json!(doc));
                }
                if field.optional {
                    f.insert("optional".to_string(), json!(true));
                }
                if field.upcastable {
                    f.insert("upcastable".to_string(), json!(true));
                }
                Value::Object(f)
            })
            .collect();
        map.insert("fields".to_string(), Value::Array(fields));
        Value::Object(map)
    }
}

impl TypeDefinition for StructDefinition {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn qualified_type_name(&self) -> String {
        qualify(self.identity.namespace(), self.identity.name())
    }

    fn qualified_user_type_name(&self) -> String {
        qualify(self.identity.user_namespace(), self.identity.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: Value) -> Result<StructDefinition, SchemaError> {
        StructDefinition::from_description(&value, "NS", "NS")
    }

    #[test]
    fn test_qualified_names() {
        let def = StructDefinition::from_description(&json!({"name": "Foo"}), "NS", "user").unwrap();
        assert_eq!(def.qualified_type_name(), "NS::Foo");
        assert_eq!(def.qualified_user_type_name(), "user::Foo");
        assert!(def.fields().is_empty());
    }

    #[test]
    fn test_fields_parse() {
        let def = parse(json!({
            "name": "Function",
            "key": ["Entry"],
            "fields": [
                {"name": "Entry", "type": "uint64"},
                {"name": "Name", "type": "string", "optional": true, "doc": "display name"},
                {"name": "Blocks", "sequence": {"type": "SortedVector", "elementType": "BasicBlock"}},
                {"name": "Prototype", "type": "Type", "upcastable": true}
            ]
        }))
        .unwrap();

        assert_eq!(def.key(), ["Entry".to_string()]);
        assert_eq!(def.fields()[0].ty, FieldType::Scalar(TypeRef::Primitive(Primitive::Uint64)));
        assert!(def.fields()[1].optional);
        assert_eq!(
            def.fields()[2].ty,
            FieldType::Sequence {
                kind: SequenceKind::SortedVector,
                element: TypeRef::Unresolved("BasicBlock".to_string())
            }
        );
        assert!(def.fields()[3].upcastable);
    }

    #[test]
    fn test_type_and_sequence_exclusive() {
        let err = parse(json!({
            "name": "Foo",
            "fields": [{"name": "x", "type": "bool", "sequence": {"type": "Vector", "elementType": "bool"}}]
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidValue { .. }));

        let err = parse(json!({"name": "Foo", "fields": [{"name": "x"}]})).unwrap_err();
        assert!(matches!(err, SchemaError::MissingKey { ref key, .. } if key == "type"));
    }

    #[test]
    fn test_optional_sequence_rejected() {
        let err = parse(json!({
            "name": "Foo",
            "fields": [{"name": "x", "optional": true, "sequence": {"type": "Vector", "elementType": "bool"}}]
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidValue { ref key, .. } if key == "optional"));
    }

    #[test]
    fn test_unknown_sequence_kind() {
        let err = parse(json!({
            "name": "Foo",
            "fields": [{"name": "x", "sequence": {"type": "Set", "elementType": "bool"}}]
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidValue { ref reason, .. } if reason.contains("Set")));
    }

    #[test]
    fn test_duplicate_field() {
        let err = parse(json!({
            "name": "Foo",
            "fields": [{"name": "x", "type": "bool"}, {"name": "x", "type": "string"}]
        }))
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateField {
                element: "NS::Foo".to_string(),
                field: "x".to_string()
            }
        );
    }

    #[test]
    fn test_unexpected_field_key() {
        let err = parse(json!({"name": "Foo", "fields": [{"name": "x", "type": "bool", "const": true}]}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnexpectedKey { ref key, .. } if key == "const"));
    }

    #[test]
    fn test_primitive_name_rejected() {
        assert!(matches!(
            parse(json!({"name": "string"})),
            Err(SchemaError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_primitive_from_str() {
        for primitive in Primitive::ALL {
            assert_eq!(primitive.as_str().parse::<Primitive>(), Ok(primitive));
        }
        assert!("u64".parse::<Primitive>().is_err());
        assert!(Primitive::Uint8.is_integer());
        assert!(!Primitive::Float64.is_integer());
    }

    #[test]
    fn test_integer_bounds() {
        assert_eq!(Primitive::Uint8.integer_bounds(), Some((0, 255)));
        assert_eq!(Primitive::Int16.integer_bounds(), Some((-32768, 32767)));
        assert_eq!(Primitive::Uint64.integer_bounds(), Some((0, u64::MAX as i128)));
        assert_eq!(Primitive::Bool.integer_bounds(), None);
        assert_eq!(Primitive::Float32.integer_bounds(), None);
    }

    #[test]
    fn test_fields_differing_by_trailing_underscore() {
        let err = parse(json!({
            "name": "Foo",
            "fields": [{"name": "to_dict", "type": "bool"}, {"name": "to_dict_", "type": "bool"}]
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { ref field, .. } if field == "to_dict_"));
    }
}
