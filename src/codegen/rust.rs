//! Rust Code Emitter
//!
//! Generates serde-annotated Rust types from a resolved schema.
//!
//! - enums: fieldless `#[repr(u32)]` enums with explicit ordinals
//! - structs: flattened records (inherited fields first), snake_case fields
//!   renamed back to schema names
//! - abstract bases: an internally tagged enum over the concrete descendants

use crate::model::{
    DefId, Definition, EnumDefinition, Field, FieldType, StructDefinition, TypeDefinition, TypeRef,
};
use crate::schema::{Schema, KIND_TAG};

use super::names::{quote, render_doc, rust_field_names};
use super::{emission_order, header, polymorphic_bases, Emitter, Language, RenderProfile};

pub struct RustEmitter;

/// Associated items generated on every enum
const ENUM_ITEMS: &[&str] = &["MEMBERS", "ordinal", "from_ordinal", "name", "from_name"];

/// Methods generated on every polymorphic wrapper
const POLYMORPHIC_ITEMS: &[&str] = &["kind_tag"];

impl Emitter for RustEmitter {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn emit(&self, schema: &Schema, profile: &RenderProfile) -> String {
        let mut output = header(schema, profile);
        output.push('\n');
        output.push_str("#![allow(non_camel_case_types, non_snake_case)]\n\n");
        output.push_str("use serde::{Deserialize, Serialize};\n");

        let polymorphic: Vec<DefId> = polymorphic_bases(schema).into_iter().map(|(id, _)| id).collect();

        for id in emission_order(schema) {
            output.push('\n');
            match &schema[id] {
                Definition::Enum(e) => emit_enum(&mut output, e, profile),
                Definition::Struct(s) if s.is_abstract() => {
                    if polymorphic.contains(&id) {
                        emit_polymorphic(&mut output, schema, id, s, profile);
                    } else {
                        output.push_str(&format!(
                            "// {} is abstract and has no concrete descendants\n",
                            s.name()
                        ));
                    }
                }
                Definition::Struct(s) => emit_struct(&mut output, schema, id, s, profile),
            }
        }

        output
    }
}

// =============================================================================
// Enum Emission
// =============================================================================

fn emit_enum(output: &mut String, e: &EnumDefinition, profile: &RenderProfile) {
    let name = type_ident(e.name(), profile);
    let i1 = profile.indent(1);
    let i2 = profile.indent(2);
    let i3 = profile.indent(3);
    let base = profile.ordinal_base;
    let variants: Vec<String> = e
        .members()
        .iter()
        .map(|m| profile.escape_reserved(&m.name, ENUM_ITEMS))
        .collect();

    render_doc(output, e.doc(), "", "/// ");
    output.push_str(
        "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]\n",
    );
    output.push_str("#[repr(u32)]\n");
    output.push_str(&format!("pub enum {} {{\n", name));
    for ((ordinal, member), variant) in e.ordinals(base).zip(&variants) {
        render_doc(output, member.doc.as_deref(), &i1, "/// ");
        if needs_rename(variant, &member.name) {
            output.push_str(&format!("{}#[serde(rename = {})]\n", i1, quote(&member.name)));
        }
        output.push_str(&format!("{}{} = {},\n", i1, variant, ordinal));
    }
    output.push_str("}\n\n");

    output.push_str(&format!("impl {} {{\n", name));
    output.push_str(&format!("{}/// Members in declaration order\n", i1));
    output.push_str(&format!(
        "{}pub const MEMBERS: [{}; {}] = [{}];\n\n",
        i1,
        name,
        variants.len(),
        variants
            .iter()
            .map(|v| format!("{}::{}", name, v))
            .collect::<Vec<_>>()
            .join(", ")
    ));

    output.push_str(&format!("{}pub const fn ordinal(self) -> u32 {{\n", i1));
    output.push_str(&format!("{}self as u32\n", i2));
    output.push_str(&format!("{}}}\n\n", i1));

    output.push_str(&format!("{}pub const fn from_ordinal(ordinal: u32) -> Option<Self> {{\n", i1));
    output.push_str(&format!("{}match ordinal {{\n", i2));
    for ((ordinal, _), variant) in e.ordinals(base).zip(&variants) {
        output.push_str(&format!("{}{} => Some({}::{}),\n", i3, ordinal, name, variant));
    }
    output.push_str(&format!("{}_ => None,\n", i3));
    output.push_str(&format!("{}}}\n", i2));
    output.push_str(&format!("{}}}\n\n", i1));

    output.push_str(&format!("{}/// Member name as written on the wire\n", i1));
    output.push_str(&format!("{}pub const fn name(self) -> &'static str {{\n", i1));
    output.push_str(&format!("{}match self {{\n", i2));
    for (member, variant) in e.members().iter().zip(&variants) {
        output.push_str(&format!("{}{}::{} => {},\n", i3, name, variant, quote(&member.name)));
    }
    output.push_str(&format!("{}}}\n", i2));
    output.push_str(&format!("{}}}\n\n", i1));

    output.push_str(&format!("{}pub fn from_name(name: &str) -> Option<Self> {{\n", i1));
    output.push_str(&format!("{}match name {{\n", i2));
    for (member, variant) in e.members().iter().zip(&variants) {
        output.push_str(&format!("{}{} => Some({}::{}),\n", i3, quote(&member.name), name, variant));
    }
    output.push_str(&format!("{}_ => None,\n", i3));
    output.push_str(&format!("{}}}\n", i2));
    output.push_str(&format!("{}}}\n", i1));
    output.push_str("}\n");
}

// =============================================================================
// Struct Emission
// =============================================================================

fn emit_struct(output: &mut String, schema: &Schema, id: DefId, s: &StructDefinition, profile: &RenderProfile) {
    let name = type_ident(s.name(), profile);
    let i1 = profile.indent(1);
    let i2 = profile.indent(2);
    let fields = schema.all_fields(id);
    let idents = rust_field_names(&fields, &[], profile);

    render_doc(output, s.doc(), "", "/// ");
    output.push_str("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n");
    output.push_str(&format!("pub struct {} {{\n", name));
    for (field, ident) in fields.iter().zip(&idents) {
        emit_field(output, schema, field, ident, profile);
    }
    output.push_str("}\n");

    let key = schema.effective_key(id);
    if key.is_empty() {
        return;
    }

    // Key fields are scalars of primitive or enum type
    let key_fields: Vec<(&Field, &String)> = key
        .iter()
        .filter_map(|k| fields.iter().zip(&idents).find(|(f, _)| &f.name == k))
        .map(|(f, ident)| (*f, ident))
        .collect();
    let types: Vec<String> = key_fields
        .iter()
        .map(|(f, _)| format!("&{}", element_type(schema, f.ty.element(), profile)))
        .collect();
    let values: Vec<String> = key_fields.iter().map(|(_, ident)| format!("&self.{}", ident)).collect();

    output.push('\n');
    output.push_str(&format!("impl {} {{\n", name));
    output.push_str(&format!(
        "{}/// Identity of this value inside a sorted container\n",
        i1
    ));
    output.push_str(&format!("{}pub fn key(&self) -> ({},) {{\n", i1, types.join(", ")));
    output.push_str(&format!("{}({},)\n", i2, values.join(", ")));
    output.push_str(&format!("{}}}\n", i1));
    output.push_str("}\n");
}

fn emit_field(output: &mut String, schema: &Schema, field: &Field, ident: &str, profile: &RenderProfile) {
    let i1 = profile.indent(1);
    render_doc(output, field.doc.as_deref(), &i1, "/// ");

    let mut attrs = Vec::new();
    if needs_rename(ident, &field.name) {
        attrs.push(format!("rename = {}", quote(&field.name)));
    }
    if field.optional {
        attrs.push("default".to_string());
        attrs.push("skip_serializing_if = \"Option::is_none\"".to_string());
    } else if field.ty.is_sequence() {
        attrs.push("default".to_string());
        attrs.push("skip_serializing_if = \"Vec::is_empty\"".to_string());
    }
    if !attrs.is_empty() {
        output.push_str(&format!("{}#[serde({})]\n", i1, attrs.join(", ")));
    }

    output.push_str(&format!("{}pub {}: {},\n", i1, ident, field_type(schema, field, profile)));
}

// =============================================================================
// Polymorphic Emission
// =============================================================================

/// An abstract struct becomes an enum over its concrete descendants, tagged
/// with the concrete struct name. Fields shared by all variants (the
/// abstract struct's own and inherited ones) get accessors.
fn emit_polymorphic(
    output: &mut String,
    schema: &Schema,
    id: DefId,
    s: &StructDefinition,
    profile: &RenderProfile,
) {
    let name = type_ident(s.name(), profile);
    let i1 = profile.indent(1);
    let i2 = profile.indent(2);
    let i3 = profile.indent(3);
    let descendants = schema.concrete_descendants(id);

    render_doc(output, s.doc(), "", "/// ");
    output.push_str("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n");
    output.push_str(&format!("#[serde(tag = {})]\n", quote(KIND_TAG)));
    output.push_str(&format!("pub enum {} {{\n", name));
    for descendant in &descendants {
        let variant = type_ident(schema[*descendant].name(), profile);
        output.push_str(&format!("{}{}({}),\n", i1, variant, variant));
    }
    output.push_str("}\n\n");

    output.push_str(&format!("impl {} {{\n", name));
    output.push_str(&format!("{}/// Name of the concrete struct held\n", i1));
    output.push_str(&format!("{}pub fn kind_tag(&self) -> &'static str {{\n", i1));
    output.push_str(&format!("{}match self {{\n", i2));
    for descendant in &descendants {
        let concrete = schema[*descendant].name();
        output.push_str(&format!(
            "{}{}::{}(_) => {},\n",
            i3,
            name,
            type_ident(concrete, profile),
            quote(concrete)
        ));
    }
    output.push_str(&format!("{}}}\n", i2));
    output.push_str(&format!("{}}}\n", i1));

    let common = schema.all_fields(id);
    let accessors = rust_field_names(&common, POLYMORPHIC_ITEMS, profile);
    for (field, accessor) in common.iter().zip(&accessors) {
        output.push('\n');
        render_doc(output, field.doc.as_deref(), &i1, "/// ");
        output.push_str(&format!(
            "{}pub fn {}(&self) -> &{} {{\n",
            i1,
            accessor,
            field_type(schema, field, profile)
        ));
        output.push_str(&format!("{}match self {{\n", i2));
        for descendant in &descendants {
            let variant = type_ident(schema[*descendant].name(), profile);
            output.push_str(&format!(
                "{}{}::{}(value) => &value.{},\n",
                i3,
                name,
                variant,
                concrete_field_ident(schema, *descendant, &field.name, profile)
            ));
        }
        output.push_str(&format!("{}}}\n", i2));
        output.push_str(&format!("{}}}\n", i1));
    }
    output.push_str("}\n");

    for descendant in &descendants {
        let variant = type_ident(schema[*descendant].name(), profile);
        output.push_str(&format!("\nimpl From<{}> for {} {{\n", variant, name));
        output.push_str(&format!("{}fn from(value: {}) -> Self {{\n", i1, variant));
        output.push_str(&format!("{}{}::{}(value)\n", i2, name, variant));
        output.push_str(&format!("{}}}\n", i1));
        output.push_str("}\n");
    }
}

/// Identifier of `field` in the generated struct for `id`, which may differ
/// from the base's when a naming collision forced raw schema names
fn concrete_field_ident(schema: &Schema, id: DefId, field: &str, profile: &RenderProfile) -> String {
    let fields = schema.all_fields(id);
    let idents = rust_field_names(&fields, &[], profile);
    fields
        .iter()
        .zip(idents)
        .find(|(f, _)| f.name == field)
        .map(|(_, ident)| ident)
        .unwrap_or_else(|| profile.escape_keyword(field))
}

// =============================================================================
// Type Rendering
// =============================================================================

fn field_type(schema: &Schema, field: &Field, profile: &RenderProfile) -> String {
    match &field.ty {
        FieldType::Scalar(ty) => {
            let mut rendered = element_type(schema, ty, profile);
            if field.upcastable {
                rendered = profile.wrap_box(&rendered);
            }
            if field.optional {
                rendered = profile.wrap_optional(&rendered);
            }
            rendered
        }
        FieldType::Sequence { element, .. } => profile.wrap_array(&element_type(schema, element, profile)),
    }
}

fn element_type(schema: &Schema, ty: &TypeRef, profile: &RenderProfile) -> String {
    match ty {
        TypeRef::Primitive(p) => profile.primitive(*p).to_string(),
        TypeRef::Definition(id) => type_ident(schema[*id].name(), profile),
        TypeRef::Unresolved(name) => type_ident(name, profile),
    }
}

fn type_ident(name: &str, profile: &RenderProfile) -> String {
    profile.type_name(name)
}

/// serde strips the `r#` prefix itself
fn needs_rename(ident: &str, wire: &str) -> bool {
    ident.strip_prefix("r#").unwrap_or(ident) != wire
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn emit(value: serde_json::Value) -> String {
        let schema = Schema::from_description(&value).unwrap();
        RustEmitter.emit(&schema, &RenderProfile::rust())
    }

    fn polymorphic_schema() -> serde_json::Value {
        json!({
            "namespace": "model",
            "structs": [
                {"name": "Type", "abstract": true, "key": ["ID"], "fields": [{"name": "ID", "type": "uint64"}]},
                {"name": "PrimitiveType", "inherits": "Type", "fields": [{"name": "Size", "type": "uint8"}]},
                {"name": "TypedefType", "inherits": "Type", "fields": [
                    {"name": "UnderlyingType", "type": "Type", "upcastable": true}
                ]},
                {"name": "Binary", "fields": [
                    {"name": "Types", "sequence": {"type": "SortedVector", "elementType": "Type"}, "upcastable": true},
                    {"name": "Name", "type": "string", "optional": true}
                ]}
            ]
        })
    }

    #[test]
    fn test_enum_ordinals() {
        let code = emit(json!({
            "namespace": "model",
            "enums": [{"name": "Kind", "members": [{"name": "A"}, {"name": "B", "doc": "second"}]}]
        }));

        assert!(code.contains("pub enum Kind {\n    A = 0,\n    /// second\n    B = 1,\n}"));
        assert!(code.contains("pub const MEMBERS: [Kind; 2] = [Kind::A, Kind::B];"));
        assert!(code.contains("1 => Some(Kind::B),"));
        assert!(code.contains("Kind::A => \"A\","));
        assert!(code.contains("\"B\" => Some(Kind::B),"));
    }

    #[test]
    fn test_enum_ordinal_base() {
        let schema = Schema::from_description(&json!({
            "namespace": "model",
            "enums": [{"name": "Kind", "members": [{"name": "A"}, {"name": "B"}]}]
        }))
        .unwrap();
        let mut profile = RenderProfile::rust();
        profile.ordinal_base = 1;
        let code = RustEmitter.emit(&schema, &profile);

        assert!(code.contains("    A = 1,\n    B = 2,\n"));
        assert!(code.contains("starting at 1."));
    }

    #[test]
    fn test_keyword_members_are_renamed() {
        let code = emit(json!({
            "namespace": "model",
            "enums": [{"name": "Access", "members": [{"name": "type"}, {"name": "Self"}]}]
        }));

        assert!(code.contains("    r#type = 0,\n"));
        assert!(code.contains("    #[serde(rename = \"Self\")]\n    Self_ = 1,\n"));
    }

    #[test]
    fn test_generated_item_names_are_not_shadowed() {
        let code = emit(json!({
            "namespace": "model",
            "enums": [{"name": "Option", "members": [{"name": "MEMBERS"}, {"name": "ordinal"}, {"name": "Some"}]}],
            "structs": [
                {"name": "Base", "abstract": true, "fields": [{"name": "KindTag", "type": "string"}]},
                {"name": "Leaf", "inherits": "Base", "fields": [{"name": "Choice", "type": "Option"}]}
            ]
        }));

        assert!(code.contains("pub enum Option_ {\n"));
        assert!(code.contains("    #[serde(rename = \"MEMBERS\")]\n    MEMBERS_ = 0,\n"));
        assert!(code.contains("    #[serde(rename = \"ordinal\")]\n    ordinal_ = 1,\n"));
        assert!(code.contains("    Some = 2,\n"));
        assert!(code.contains("pub const MEMBERS: [Option_; 3] = [Option_::MEMBERS_, Option_::ordinal_, Option_::Some];"));
        assert!(code.contains("pub choice: Option_,"));
        assert!(code.contains("pub fn kind_tag_(&self) -> &String {"));
        assert!(code.contains("Base::Leaf(value) => &value.kind_tag,"));
        assert_eq!(code.matches("pub fn kind_tag(&self)").count(), 1);
    }

    #[test]
    fn test_struct_fields() {
        let code = emit(polymorphic_schema());

        assert!(code.contains("pub struct Binary {"));
        assert!(code.contains(
            "    #[serde(rename = \"Types\", default, skip_serializing_if = \"Vec::is_empty\")]\n    pub types: Vec<Type>,\n"
        ));
        assert!(code.contains(
            "    #[serde(rename = \"Name\", default, skip_serializing_if = \"Option::is_none\")]\n    pub name: Option<String>,\n"
        ));
    }

    #[test]
    fn test_inherited_fields_are_flattened() {
        let code = emit(polymorphic_schema());

        assert!(code.contains(
            "pub struct PrimitiveType {\n    #[serde(rename = \"ID\")]\n    pub id: u64,\n    #[serde(rename = \"Size\")]\n    pub size: u8,\n}"
        ));
        assert!(code.contains("pub fn key(&self) -> (&u64,) {\n        (&self.id,)\n    }"));
    }

    #[test]
    fn test_polymorphic_enum() {
        let code = emit(polymorphic_schema());

        assert!(code.contains(
            "#[serde(tag = \"Kind\")]\npub enum Type {\n    PrimitiveType(PrimitiveType),\n    TypedefType(TypedefType),\n}"
        ));
        assert!(code.contains("Type::TypedefType(_) => \"TypedefType\","));
        assert!(code.contains("pub fn id(&self) -> &u64 {"));
        assert!(code.contains("impl From<PrimitiveType> for Type {"));
        assert!(code.contains("pub underlying_type: Box<Type>,"));
    }

    #[test]
    fn test_abstract_without_descendants() {
        let code = emit(json!({
            "namespace": "model",
            "structs": [{"name": "Unused", "abstract": true}]
        }));

        assert!(code.contains("// Unused is abstract and has no concrete descendants"));
        assert!(!code.contains("pub enum Unused"));
    }

    #[test]
    fn test_output_starts_with_header() {
        let code = emit(polymorphic_schema());
        assert!(code.starts_with("// Generated by tupletree-codegen from schema `model`"));
        assert!(code.contains("use serde::{Deserialize, Serialize};"));
    }
}
