//! Schema: the resolved set of definitions of one tuple tree
//!
//! Construction runs in two passes so that definitions may reference each
//! other regardless of declaration order:
//!
//! 1. every enum and struct description is parsed into a [`Definition`] whose
//!    type references are still names, and registered under its plain and
//!    qualified names (duplicates are rejected here, including names that
//!    only differ by trailing underscores);
//! 2. every reference is replaced by the [`DefId`] it names, then the
//!    inheritance, key and upcast rules are checked on the resolved graph.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::ops::Index;
use std::path::Path;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use petgraph::algo::{kosaraju_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::error::{Result, SchemaError};
use crate::model::definition::check_namespace;
use crate::model::description::Mapping;
use crate::model::{
    spelling_stem, DefId, Definition, EnumDefinition, Field, FieldType, SequenceKind, StructDefinition,
    TypeDefinition, TypeRef,
};

/// Wire field carrying the concrete struct name of polymorphic values
pub const KIND_TAG: &str = "Kind";

/// Counts reported after a successful build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchemaStats {
    pub structs: usize,
    pub abstract_structs: usize,
    pub enums: usize,
    pub fields: usize,
    pub enum_members: usize,
}

/// A fully resolved tuple-tree schema.
///
/// Owns every definition; immutable once built.
#[derive(Debug, Clone)]
pub struct Schema {
    namespace: String,
    user_namespace: String,
    doc: Option<String>,
    definitions: Vec<Definition>,
    /// Plain names
    names: BTreeMap<String, DefId>,
    /// Qualified and user-qualified names
    qualified: BTreeMap<String, DefId>,
    root_type: Option<DefId>,
    children: BTreeMap<DefId, Vec<DefId>>,
    inheritance_order: Vec<DefId>,
}

impl Schema {
    const KEYS: &'static [&'static str] = &["namespace", "user_namespace", "root_type", "doc", "structs", "enums"];

    /// Build from a parsed description
    pub fn from_description(value: &Value) -> std::result::Result<Self, SchemaError> {
        let mapping = Mapping::new(value, "schema")?;
        mapping.deny_unknown_keys(Self::KEYS)?;

        let namespace = mapping.required_str("namespace")?;
        check_namespace("schema", "namespace", namespace)?;
        let user_namespace = mapping.optional_str("user_namespace")?.unwrap_or(namespace);
        check_namespace("schema", "user_namespace", user_namespace)?;

        let mut schema = Self {
            namespace: namespace.to_string(),
            user_namespace: user_namespace.to_string(),
            doc: mapping.optional_str("doc")?.map(str::to_string),
            definitions: Vec::new(),
            names: BTreeMap::new(),
            qualified: BTreeMap::new(),
            root_type: None,
            children: BTreeMap::new(),
            inheritance_order: Vec::new(),
        };

        // Pass 1: identities and shallow fields
        for (i, value) in mapping.optional_seq("enums")?.unwrap_or_default().iter().enumerate() {
            let def = EnumDefinition::parse(value, namespace, &format!("enums[{i}]"))?;
            schema.register(Definition::Enum(def))?;
        }
        for (i, value) in mapping.optional_seq("structs")?.unwrap_or_default().iter().enumerate() {
            let def = StructDefinition::parse(value, namespace, user_namespace, &format!("structs[{i}]"))?;
            schema.register(Definition::Struct(def))?;
        }
        info!(
            namespace = %schema.namespace,
            definitions = schema.definitions.len(),
            "registered definitions"
        );

        // Pass 2: references, then the rules that need the whole graph
        schema.resolve_references()?;
        schema.check_inheritance()?;
        schema.check_fields()?;
        schema.check_containment()?;
        if let Some(root) = mapping.optional_str("root_type")? {
            schema.root_type = Some(schema.resolve_root(root)?);
        }
        info!(namespace = %schema.namespace, "schema resolved");

        Ok(schema)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(source)?;
        Ok(Self::from_description(&value)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(source)?;
        Ok(Self::from_description(&value)?)
    }

    /// Load a description file; `.json` files are read as JSON, anything
    /// else as YAML
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading schema description");
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&source),
            _ => Self::from_yaml_str(&source),
        }
    }

    // =========================================================================
    // Pass 1
    // =========================================================================

    fn register(&mut self, definition: Definition) -> std::result::Result<(), SchemaError> {
        let id = DefId::new(self.definitions.len());
        let duplicate = |first: DefId, definitions: &[Definition]| SchemaError::DuplicateDefinition {
            name: definition.qualified_type_name(),
            first: definitions[first.index()].qualified_type_name(),
        };

        if let Some(&first) = self.names.get(definition.name()) {
            return Err(duplicate(first, &self.definitions));
        }
        let stem = spelling_stem(definition.name());
        if let Some(first) = self.definitions.iter().position(|d| spelling_stem(d.name()) == stem) {
            return Err(duplicate(DefId::new(first), &self.definitions));
        }

        let mut keys = vec![definition.qualified_type_name(), definition.qualified_user_type_name()];
        if let Definition::Enum(def) = &definition {
            keys.push(def.namespace().to_string());
        }
        for key in &keys {
            if let Some(&first) = self.qualified.get(key) {
                return Err(duplicate(first, &self.definitions));
            }
        }

        debug!(kind = definition.kind_name(), name = %definition.qualified_type_name(), "registered");
        self.names.insert(definition.name().to_string(), id);
        for key in keys {
            self.qualified.insert(key, id);
        }
        self.definitions.push(definition);
        Ok(())
    }

    // =========================================================================
    // Pass 2
    // =========================================================================

    fn resolve_references(&mut self) -> std::result::Result<(), SchemaError> {
        for index in 0..self.definitions.len() {
            let Definition::Struct(def) = &self.definitions[index] else {
                continue;
            };
            let element = def.qualified_type_name();
            let mut resolved = def.clone();

            if let Some(base) = resolved.inherits_mut() {
                self.resolve_ref(base, &element, "inherits")?;
            }
            for field in resolved.fields_mut() {
                let field_name = field.name.clone();
                self.resolve_ref(field.ty.element_mut(), &element, &field_name)?;
            }

            self.definitions[index] = Definition::Struct(resolved);
        }
        Ok(())
    }

    fn resolve_ref(&self, ty: &mut TypeRef, element: &str, field: &str) -> std::result::Result<(), SchemaError> {
        if let TypeRef::Unresolved(name) = ty {
            let id = self.resolve_id(name).ok_or_else(|| SchemaError::UndefinedReference {
                element: element.to_string(),
                field: field.to_string(),
                name: name.clone(),
                suggestion: self.suggest(name),
            })?;
            *ty = TypeRef::Definition(id);
        }
        Ok(())
    }

    fn suggest(&self, query: &str) -> Option<String> {
        let matcher = SkimMatcherV2::default();
        self.names
            .keys()
            .filter_map(|candidate| {
                let score = matcher
                    .fuzzy_match(candidate, query)
                    .max(matcher.fuzzy_match(query, candidate))?;
                Some((score, candidate))
            })
            .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(a.1)))
            .map(|(_, name)| name.clone())
    }

    fn check_inheritance(&mut self) -> std::result::Result<(), SchemaError> {
        let mut graph: DiGraph<DefId, ()> = DiGraph::new();
        let mut nodes: BTreeMap<DefId, NodeIndex> = BTreeMap::new();
        for (id, _) in self.structs() {
            nodes.insert(id, graph.add_node(id));
        }

        for (id, def) in self.structs() {
            let Some(base) = def.base() else {
                continue;
            };
            let base_def = &self[base];
            let reason = match base_def {
                Definition::Enum(_) => Some("it is an enum"),
                Definition::Struct(b) if !b.is_abstract() => Some("it is not abstract"),
                Definition::Struct(_) => None,
            };
            if let Some(reason) = reason {
                return Err(SchemaError::InvalidInheritance {
                    element: def.qualified_type_name(),
                    base: base_def.name().to_string(),
                    reason: reason.to_string(),
                });
            }
            graph.add_edge(nodes[&base], nodes[&id], ());
        }

        toposort(&graph, None).map_err(|cycle| SchemaError::InheritanceCycle {
            element: self[graph[cycle.node_id()]].qualified_type_name(),
        })?;

        let mut order = Vec::new();
        let mut visited = HashSet::new();
        for (id, _) in self.structs() {
            let mut chain = self.ancestry(id);
            chain.retain(|ancestor| visited.insert(*ancestor));
            order.extend(chain);
        }

        let mut children: BTreeMap<DefId, Vec<DefId>> = BTreeMap::new();
        for (id, def) in self.structs() {
            if let Some(base) = def.base() {
                children.entry(base).or_default().push(id);
            }
        }

        self.inheritance_order = order;
        self.children = children;
        Ok(())
    }

    fn check_fields(&self) -> std::result::Result<(), SchemaError> {
        for (id, def) in self.structs() {
            let element = def.qualified_type_name();

            let fields = self.all_fields(id);
            let mut seen = HashSet::new();
            for field in &fields {
                if !seen.insert(spelling_stem(&field.name)) {
                    return Err(SchemaError::DuplicateField {
                        element,
                        field: field.name.clone(),
                    });
                }
            }

            if self.ancestry(id).len() > 1 && fields.iter().any(|f| f.name == KIND_TAG) {
                return Err(SchemaError::InvalidValue {
                    element,
                    key: KIND_TAG.to_string(),
                    reason: "field name is reserved for the polymorphic tag".to_string(),
                });
            }

            for key in def.key() {
                self.check_key_field(id, &element, key)?;
            }

            for field in def.fields() {
                self.check_field(&element, field)?;
            }
        }
        Ok(())
    }

    fn check_key_field(&self, id: DefId, element: &str, key: &str) -> std::result::Result<(), SchemaError> {
        let invalid = |reason: &str| SchemaError::InvalidKey {
            element: element.to_string(),
            field: key.to_string(),
            reason: reason.to_string(),
        };
        let field = self
            .all_fields(id)
            .into_iter()
            .find(|f| f.name == key)
            .ok_or_else(|| invalid("no such field"))?;

        if field.optional {
            return Err(invalid("key fields cannot be optional"));
        }
        match &field.ty {
            FieldType::Sequence { .. } => Err(invalid("key fields must be scalars")),
            FieldType::Scalar(TypeRef::Definition(target)) if self[*target].as_struct().is_some() => {
                Err(invalid("key fields must be primitives or enums"))
            }
            FieldType::Scalar(_) => Ok(()),
        }
    }

    fn check_field(&self, element: &str, field: &Field) -> std::result::Result<(), SchemaError> {
        let upcast_error = |reason: String| SchemaError::InvalidUpcast {
            element: element.to_string(),
            field: field.name.clone(),
            reason,
        };
        let target = field.ty.element().definition();
        let target_struct = target.and_then(|id| self[id].as_struct().map(|s| (id, s)));

        match target_struct {
            Some((id, s)) if s.is_abstract() => {
                if !field.upcastable {
                    return Err(upcast_error(format!(
                        "references abstract struct `{}` without `upcastable: true`",
                        s.name()
                    )));
                }
                if self.concrete_descendants(id).is_empty() {
                    return Err(upcast_error(format!(
                        "is upcastable but `{}` has no concrete descendants",
                        s.name()
                    )));
                }
            }
            _ if field.upcastable => {
                return Err(upcast_error("is upcastable but does not reference an abstract struct".to_string()));
            }
            _ => {}
        }

        if let FieldType::Sequence {
            kind: SequenceKind::SortedVector,
            element: TypeRef::Definition(target),
        } = &field.ty
        {
            if let Definition::Struct(s) = &self[*target] {
                if self.effective_key(*target).is_empty() {
                    return Err(SchemaError::InvalidKey {
                        element: element.to_string(),
                        field: field.name.clone(),
                        reason: format!("SortedVector element `{}` has no key", s.name()),
                    });
                }
            }
        }
        Ok(())
    }

    /// Structs may not contain themselves by value, directly or indirectly.
    fn check_containment(&self) -> std::result::Result<(), SchemaError> {
        let mut graph: DiGraph<DefId, ()> = DiGraph::new();
        let mut nodes: BTreeMap<DefId, NodeIndex> = BTreeMap::new();
        for (id, _) in self.structs() {
            nodes.insert(id, graph.add_node(id));
        }
        for (id, _) in self.structs() {
            for field in self.all_fields(id) {
                if let FieldType::Scalar(TypeRef::Definition(target)) = &field.ty {
                    if !field.upcastable && self[*target].as_struct().is_some() {
                        graph.add_edge(nodes[&id], nodes[target], ());
                    }
                }
            }
        }

        for scc in kosaraju_scc(&graph) {
            let first = scc[0];
            if scc.len() > 1 || graph.contains_edge(first, first) {
                let mut members: Vec<DefId> = scc.iter().map(|n| graph[*n]).collect();
                members.sort();
                return Err(SchemaError::InvalidValue {
                    element: self[members[0]].qualified_type_name(),
                    key: "fields".to_string(),
                    reason: "struct contains itself by value".to_string(),
                });
            }
        }
        Ok(())
    }

    fn resolve_root(&self, name: &str) -> std::result::Result<DefId, SchemaError> {
        let id = self.resolve_id(name).ok_or_else(|| SchemaError::UndefinedReference {
            element: "schema".to_string(),
            field: "root_type".to_string(),
            name: name.to_string(),
            suggestion: self.suggest(name),
        })?;
        let reason = match &self[id] {
            Definition::Enum(_) => Some("it is an enum"),
            Definition::Struct(s) if s.is_abstract() => Some("it is abstract"),
            Definition::Struct(_) => None,
        };
        match reason {
            Some(reason) => Err(SchemaError::InvalidRootType {
                name: name.to_string(),
                reason: reason.to_string(),
            }),
            None => Ok(id),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn user_namespace(&self) -> &str {
        &self.user_namespace
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions in declaration order (enums first, then structs)
    pub fn definitions(&self) -> impl Iterator<Item = (DefId, &Definition)> {
        self.definitions.iter().enumerate().map(|(i, d)| (DefId::new(i), d))
    }

    pub fn get(&self, id: DefId) -> Option<&Definition> {
        self.definitions.get(id.index())
    }

    pub fn structs(&self) -> impl Iterator<Item = (DefId, &StructDefinition)> {
        self.definitions().filter_map(|(id, d)| d.as_struct().map(|s| (id, s)))
    }

    pub fn enums(&self) -> impl Iterator<Item = (DefId, &EnumDefinition)> {
        self.definitions().filter_map(|(id, d)| d.as_enum().map(|e| (id, e)))
    }

    /// Look up a definition by plain name, qualified name or user-qualified
    /// name. Enums also answer to their namespace (`model::Kind`).
    pub fn resolve(&self, type_name: &str) -> Option<&Definition> {
        self.resolve_id(type_name).map(|id| &self[id])
    }

    pub fn resolve_id(&self, type_name: &str) -> Option<DefId> {
        self.names
            .get(type_name)
            .or_else(|| self.qualified.get(type_name))
            .copied()
    }

    pub fn root_type(&self) -> Option<DefId> {
        self.root_type
    }

    /// Structs ordered so that every base precedes the structs deriving from
    /// it; declaration order otherwise
    pub fn inheritance_order(&self) -> &[DefId] {
        &self.inheritance_order
    }

    /// Structs directly inheriting from `id`
    pub fn children(&self, id: DefId) -> &[DefId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Non-abstract structs transitively inheriting from `id`, in declaration
    /// order
    pub fn concrete_descendants(&self, id: DefId) -> Vec<DefId> {
        let mut result = Vec::new();
        let mut stack = self.children(id).to_vec();
        let mut visited = HashSet::new();
        while let Some(child) = stack.pop() {
            if !visited.insert(child) {
                continue;
            }
            if matches!(&self[child], Definition::Struct(s) if !s.is_abstract()) {
                result.push(child);
            }
            stack.extend_from_slice(self.children(child));
        }
        result.sort();
        result
    }

    /// `id` preceded by its bases, outermost base first
    pub fn ancestry(&self, id: DefId) -> Vec<DefId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(base) = self[current].as_struct().and_then(StructDefinition::base) {
            if chain.contains(&base) {
                break;
            }
            chain.push(base);
            current = base;
        }
        chain.reverse();
        chain
    }

    /// Fields of `id` including inherited ones, outermost base first
    pub fn all_fields(&self, id: DefId) -> Vec<&Field> {
        self.ancestry(id)
            .into_iter()
            .filter_map(|ancestor| self[ancestor].as_struct())
            .flat_map(|s| s.fields())
            .collect()
    }

    /// The key of `id`, inherited from the nearest base declaring one
    pub fn effective_key(&self, id: DefId) -> &[String] {
        self.ancestry(id)
            .into_iter()
            .rev()
            .filter_map(|ancestor| self[ancestor].as_struct())
            .map(StructDefinition::key)
            .find(|key| !key.is_empty())
            .unwrap_or_default()
    }

    /// Name of a type reference as written in descriptions
    pub fn type_name(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Primitive(p) => p.as_str().to_string(),
            TypeRef::Unresolved(name) => name.clone(),
            TypeRef::Definition(id) => self[*id].name().to_string(),
        }
    }

    pub fn stats(&self) -> SchemaStats {
        SchemaStats {
            structs: self.structs().count(),
            abstract_structs: self.structs().filter(|(_, s)| s.is_abstract()).count(),
            enums: self.enums().count(),
            fields: self.structs().map(|(_, s)| s.fields().len()).sum(),
            enum_members: self.enums().map(|(_, e)| e.members().len()).sum(),
        }
    }

    /// Normalised description: explicit namespaces, declaration order kept
    pub fn to_description(&self) -> Value {
        let mut map = Map::new();
        map.insert("namespace".to_string(), json!(self.namespace));
        if self.user_namespace != self.namespace {
            map.insert("user_namespace".to_string(), json!(self.user_namespace));
        }
        if let Some(doc) = &self.doc {
            map.insert("doc".to_string(), json!(doc));
        }
        if let Some(root) = self.root_type {
            map.insert("root_type".to_string(), json!(self[root].name()));
        }
        let type_name = |ty: &TypeRef| self.type_name(ty);
        map.insert(
            "enums".to_string(),
            Value::Array(self.enums().map(|(_, e)| e.to_description()).collect()),
        );
        map.insert(
            "structs".to_string(),
            Value::Array(self.structs().map(|(_, s)| s.to_description(type_name)).collect()),
        );
        Value::Object(map)
    }
}

impl Index<DefId> for Schema {
    type Output = Definition;

    fn index(&self, id: DefId) -> &Definition {
        &self.definitions[id.index()]
    }
}
