//! Enum definitions: closed, ordered sets of named values

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::definition::{check_identifier, qualify, spelling_stem, Identity, TypeDefinition};
use super::description::Mapping;
use crate::error::SchemaError;

/// Leaf name of the generated value type inside an enum's namespace
pub const ENUM_VALUES_TYPE: &str = "Values";

/// One named value of an enum
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumMember {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl EnumMember {
    const KEYS: &'static [&'static str] = &["name", "doc"];

    /// Parse a member description: `{name: string, doc?: string}`
    pub fn from_description(value: &Value) -> Result<Self, SchemaError> {
        Self::parse(value, "enum member")
    }

    pub(crate) fn parse(value: &Value, element: &str) -> Result<Self, SchemaError> {
        let mapping = Mapping::new(value, element)?;
        mapping.deny_unknown_keys(Self::KEYS)?;

        let name = mapping.required_str("name")?;
        check_identifier(mapping.element(), "name", name)?;

        Ok(Self {
            name: name.to_string(),
            doc: mapping.optional_str("doc")?.map(str::to_string),
        })
    }

    pub fn to_description(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".to_string(), json!(self.name));
        if let Some(doc) = &self.doc {
            map.insert("doc".to_string(), json!(doc));
        }
        Value::Object(map)
    }
}

/// A closed set of named values.
///
/// Member order is the declaration order of the description and determines
/// ordinals: the member at position `i` has ordinal `base + i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumDefinition {
    #[serde(flatten)]
    identity: Identity,
    members: Vec<EnumMember>,
}

impl EnumDefinition {
    const KEYS: &'static [&'static str] = &["name", "members", "doc"];

    /// Build an enum definition directly from its parts
    pub fn new(identity: Identity, members: Vec<EnumMember>) -> Result<Self, SchemaError> {
        let element = identity.namespace().to_string();
        if members.is_empty() {
            return Err(SchemaError::EmptyCollection {
                element,
                key: "members".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for member in &members {
            check_identifier(&element, "name", &member.name)?;
            if !seen.insert(spelling_stem(&member.name)) {
                return Err(SchemaError::DuplicateMember {
                    element,
                    member: member.name.clone(),
                });
            }
        }

        Ok(Self { identity, members })
    }

    /// Parse `{name, members: [...], doc?}`.
    ///
    /// Both namespaces become `default_namespace::name`.
    pub fn from_description(value: &Value, default_namespace: &str) -> Result<Self, SchemaError> {
        Self::parse(value, default_namespace, "enum")
    }

    pub(crate) fn parse(
        value: &Value,
        default_namespace: &str,
        element: &str,
    ) -> Result<Self, SchemaError> {
        let mut mapping = Mapping::new(value, element)?;
        mapping.deny_unknown_keys(Self::KEYS)?;

        let name = mapping.required_str("name")?;
        check_identifier(mapping.element(), "name", name)?;
        let namespace = qualify(default_namespace, name);
        mapping.relabel(namespace.clone());

        let doc = mapping.optional_str("doc")?.map(str::to_string);
        let identity = Identity::new(mapping.element(), namespace.clone(), namespace, name, doc)?;

        let members = mapping
            .required_seq("members")?
            .iter()
            .enumerate()
            .map(|(i, member)| {
                EnumMember::parse(member, &format!("{}.members[{i}]", mapping.element()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(identity, members)
    }

    pub fn members(&self) -> &[EnumMember] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Ordinal of `name` when ordinals start at `base`, `None` when the
    /// member is unknown or its ordinal does not fit in a `u32`
    pub fn ordinal_of(&self, name: &str, base: u32) -> Option<u32> {
        let index = self.members.iter().position(|m| m.name == name)?;
        base.checked_add(u32::try_from(index).ok()?)
    }

    /// Largest ordinal when ordinals start at `base`, `None` on overflow
    pub fn last_ordinal(&self, base: u32) -> Option<u32> {
        base.checked_add(u32::try_from(self.members.len().saturating_sub(1)).ok()?)
    }

    /// Member carrying `ordinal` when ordinals start at `base`
    pub fn member_by_ordinal(&self, ordinal: u32, base: u32) -> Option<&EnumMember> {
        let index = ordinal.checked_sub(base)?;
        self.members.get(index as usize)
    }

    /// Members paired with their ordinals.
    ///
    /// Stops at the first member whose ordinal would overflow; callers check
    /// [`EnumDefinition::last_ordinal`] first.
    pub fn ordinals(&self, base: u32) -> impl Iterator<Item = (u32, &EnumMember)> {
        self.members.iter().enumerate().map_while(move |(index, member)| {
            let ordinal = base.checked_add(u32::try_from(index).ok()?)?;
            Some((ordinal, member))
        })
    }

    /// Re-serialize to the description format, preserving member order
    pub fn to_description(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".to_string(), json!(self.name()));
        if let Some(doc) = self.doc() {
            map.insert("doc".to_string(), json!(doc));
        }
        map.insert(
            "members".to_string(),
            Value::Array(self.members.iter().map(EnumMember::to_description).collect()),
        );
        Value::Object(map)
    }
}

impl TypeDefinition for EnumDefinition {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn qualified_type_name(&self) -> String {
        qualify(self.identity.namespace(), ENUM_VALUES_TYPE)
    }

    fn qualified_user_type_name(&self) -> String {
        qualify(self.identity.user_namespace(), ENUM_VALUES_TYPE)
    }
}
