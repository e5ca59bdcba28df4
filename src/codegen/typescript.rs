//! TypeScript Code Emitter
//!
//! Generates interfaces plus parse/serialize functions. Parsing validates
//! the shape of untrusted JSON and throws with the path of the first bad
//! value; serializing produces the canonical wire form (optional fields and
//! empty sequences omitted).

use crate::model::{
    DefId, Definition, EnumDefinition, Field, FieldType, Primitive, StructDefinition, TypeDefinition, TypeRef,
};
use crate::schema::{Schema, KIND_TAG};

use super::names::{quote, render_doc, to_lower_camel};
use super::{emission_order, header, polymorphic_bases, Emitter, Language, RenderProfile};

pub struct TypeScriptEmitter;

impl Emitter for TypeScriptEmitter {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn emit(&self, schema: &Schema, profile: &RenderProfile) -> String {
        let mut output = header(schema, profile);
        output.push('\n');
        emit_runtime(&mut output, profile);

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
// Runtime Helpers
// =============================================================================

/// Shape checks used by every parse function, emitted once per file
fn emit_runtime(output: &mut String, profile: &RenderProfile) {
    let i1 = profile.indent(1);
    let i2 = profile.indent(2);

    let checks: [(&str, &str, &str, &str); 4] = [
        ("expectString", "string", "typeof raw === \"string\"", "a string"),
        ("expectNumber", "number", "typeof raw === \"number\"", "a number"),
        ("expectBoolean", "boolean", "typeof raw === \"boolean\"", "a boolean"),
        ("expectArray", "unknown[]", "Array.isArray(raw)", "an array"),
    ];

    output.push_str(
        "function expectObject(raw: unknown, what: string): Record<string, unknown> {\n",
    );
    output.push_str(&format!(
        "{}if (typeof raw !== \"object\" || raw === null || Array.isArray(raw)) {{\n",
        i1
    ));
    output.push_str(&format!("{}throw new Error(`${{what}}: expected an object`);\n", i2));
    output.push_str(&format!("{}}}\n", i1));
    output.push_str(&format!("{}return raw as Record<string, unknown>;\n", i1));
    output.push_str("}\n");

    for (function, ty, test, expected) in checks {
        output.push('\n');
        output.push_str(&format!("function {}(raw: unknown, what: string): {} {{\n", function, ty));
        output.push_str(&format!("{}if (!({})) {{\n", i1, test));
        output.push_str(&format!("{}throw new Error(`${{what}}: expected {}`);\n", i2, expected));
        output.push_str(&format!("{}}}\n", i1));
        output.push_str(&format!("{}return raw;\n", i1));
        output.push_str("}\n");
    }

    output.push('\n');
    output.push_str(
        "function expectInteger(raw: unknown, what: string, min: number, max: number): number {\n",
    );
    output.push_str(&format!(
        "{}if (typeof raw !== \"number\" || !Number.isInteger(raw) || raw < min || raw > max) {{\n",
        i1
    ));
    output.push_str(&format!(
        "{}throw new Error(`${{what}}: expected an integer in [${{min}}, ${{max}}]`);\n",
        i2
    ));
    output.push_str(&format!("{}}}\n", i1));
    output.push_str(&format!("{}return raw;\n", i1));
    output.push_str("}\n");
}

// =============================================================================
// Enum Emission
// =============================================================================

fn emit_enum(output: &mut String, e: &EnumDefinition, profile: &RenderProfile) {
    let name = profile.type_name(e.name());
    let lower = to_lower_camel(&name);
    let members = format!("{}Members", name);
    let i1 = profile.indent(1);
    let i2 = profile.indent(2);
    let base = profile.ordinal_base;

    render_doc(output, e.doc(), "", "// ");
    let union: Vec<String> = e.members().iter().map(|m| quote(&m.name)).collect();
    output.push_str(&format!("export type {} = {};\n\n", name, union.join(" | ")));

    output.push_str("/** Members in declaration order */\n");
    output.push_str(&format!(
        "export const {}: readonly {}[] = [{}];\n\n",
        members,
        name,
        union.join(", ")
    ));

    output.push_str(&format!("export function {}Ordinal(value: {}): number {{\n", lower, name));
    output.push_str(&format!("{}return {}.indexOf(value) + {};\n", i1, members, base));
    output.push_str("}\n\n");

    output.push_str(&format!(
        "export function {}FromOrdinal(ordinal: number): {} | undefined {{\n",
        lower, name
    ));
    output.push_str(&format!("{}return {}[ordinal - {}];\n", i1, members, base));
    output.push_str("}\n\n");

    output.push_str(&format!(
        "export function parse{}(raw: unknown, what = {}): {} {{\n",
        name,
        quote(&name),
        name
    ));
    output.push_str(&format!(
        "{}if (typeof raw === \"string\" && ({} as readonly string[]).includes(raw)) {{\n",
        i1, members
    ));
    output.push_str(&format!("{}return raw as {};\n", i2, name));
    output.push_str(&format!("{}}}\n", i1));
    output.push_str(&format!(
        "{}throw new Error(`${{what}}: invalid {} member ${{JSON.stringify(raw)}}`);\n",
        i1, name
    ));
    output.push_str("}\n\n");

    output.push_str(&format!("export function serialize{}(value: {}): string {{\n", name, name));
    output.push_str(&format!("{}return value;\n", i1));
    output.push_str("}\n");
}

// =============================================================================
// Struct Emission
// =============================================================================

fn emit_struct(output: &mut String, schema: &Schema, id: DefId, s: &StructDefinition, profile: &RenderProfile) {
    let name = profile.type_name(s.name());
    let i1 = profile.indent(1);
    let i2 = profile.indent(2);
    let fields = schema.all_fields(id);

    render_doc(output, s.doc(), "", "// ");
    output.push_str(&format!("export interface {} {{\n", name));
    for field in &fields {
        render_doc(output, field.doc.as_deref(), &i1, "// ");
        let marker = if field.optional { "?" } else { "" };
        output.push_str(&format!(
            "{}{}{}: {};\n",
            i1,
            property(&field.name),
            marker,
            field_type(schema, field, profile)
        ));
    }
    output.push_str("}\n\n");

    output.push_str(&format!(
        "export function parse{}(raw: unknown, what = {}): {} {{\n",
        name,
        quote(&name),
        name
    ));
    output.push_str(&format!("{}const obj = expectObject(raw, what);\n", i1));
    output.push_str(&format!("{}return {{\n", i1));
    for field in &fields {
        let access = format!("obj[{}]", quote(&field.name));
        let path = format!("`${{what}}.{}`", field.name);
        let value = match &field.ty {
            FieldType::Scalar(ty) if field.optional => format!(
                "{access} === undefined || {access} === null ? undefined : {}",
                parse_expr(schema, ty, &access, &path, profile)
            ),
            FieldType::Scalar(ty) => parse_expr(schema, ty, &access, &path, profile),
            FieldType::Sequence { element, .. } => {
                let item_path = format!("`${{what}}.{}[${{index}}]`", field.name);
                format!(
                    "expectArray({access} ?? [], {path}).map((item, index) => {})",
                    parse_expr(schema, element, "item", &item_path, profile)
                )
            }
        };
        output.push_str(&format!("{}{}: {},\n", i2, property(&field.name), value));
    }
    output.push_str(&format!("{}}};\n", i1));
    output.push_str("}\n\n");

    output.push_str(&format!(
        "export function serialize{}(value: {}): Record<string, unknown> {{\n",
        name, name
    ));
    output.push_str(&format!("{}const out: Record<string, unknown> = {{}};\n", i1));
    for field in &fields {
        emit_serialize_field(output, schema, field, profile);
    }
    output.push_str(&format!("{}return out;\n", i1));
    output.push_str("}\n");
}

fn emit_serialize_field(output: &mut String, schema: &Schema, field: &Field, profile: &RenderProfile) {
    let i1 = profile.indent(1);
    let i2 = profile.indent(2);
    let key = quote(&field.name);
    let access = format!("value[{}]", key);

    match &field.ty {
        FieldType::Scalar(ty) if field.optional => {
            output.push_str(&format!("{}if ({} !== undefined) {{\n", i1, access));
            output.push_str(&format!(
                "{}out[{}] = {};\n",
                i2,
                key,
                serialize_expr(schema, ty, &access, profile)
            ));
            output.push_str(&format!("{}}}\n", i1));
        }
        FieldType::Scalar(ty) => {
            output.push_str(&format!(
                "{}out[{}] = {};\n",
                i1,
                key,
                serialize_expr(schema, ty, &access, profile)
            ));
        }
        FieldType::Sequence { element, .. } => {
            output.push_str(&format!("{}if ({}.length > 0) {{\n", i1, access));
            output.push_str(&format!(
                "{}out[{}] = {}.map((item) => {});\n",
                i2,
                key,
                access,
                serialize_expr(schema, element, "item", profile)
            ));
            output.push_str(&format!("{}}}\n", i1));
        }
    }
}

// =============================================================================
// Polymorphic Emission
// =============================================================================

/// A union of the concrete descendants, each intersected with its tag
fn emit_polymorphic(
    output: &mut String,
    schema: &Schema,
    id: DefId,
    s: &StructDefinition,
    profile: &RenderProfile,
) {
    let name = profile.type_name(s.name());
    let i1 = profile.indent(1);
    let i2 = profile.indent(2);
    let i3 = profile.indent(3);
    let descendants = schema.concrete_descendants(id);
    let tag = quote(KIND_TAG);

    render_doc(output, s.doc(), "", "// ");
    output.push_str(&format!("export type {} =\n", name));
    for descendant in &descendants {
        let concrete = schema[*descendant].name();
        output.push_str(&format!(
            "{}| ({{ {}: {} }} & {})\n",
            i1,
            KIND_TAG,
            quote(concrete),
            profile.type_name(concrete)
        ));
    }
    output.push_str(";\n\n");

    output.push_str(&format!(
        "export function parse{}(raw: unknown, what = {}): {} {{\n",
        name,
        quote(&name),
        name
    ));
    output.push_str(&format!("{}const obj = expectObject(raw, what);\n", i1));
    output.push_str(&format!("{}switch (obj[{}]) {{\n", i1, tag));
    for descendant in &descendants {
        let concrete = schema[*descendant].name();
        output.push_str(&format!("{}case {}:\n", i2, quote(concrete)));
        output.push_str(&format!(
            "{}return {{ {}: {}, ...parse{}(obj, what) }};\n",
            i3,
            KIND_TAG,
            quote(concrete),
            profile.type_name(concrete)
        ));
    }
    output.push_str(&format!("{}default:\n", i2));
    output.push_str(&format!(
        "{}throw new Error(`${{what}}: unknown {} kind ${{JSON.stringify(obj[{}])}}`);\n",
        i3, name, tag
    ));
    output.push_str(&format!("{}}}\n", i1));
    output.push_str("}\n\n");

    output.push_str(&format!(
        "export function serialize{}(value: {}): Record<string, unknown> {{\n",
        name, name
    ));
    output.push_str(&format!("{}switch (value.{}) {{\n", i1, KIND_TAG));
    for descendant in &descendants {
        let concrete = schema[*descendant].name();
        output.push_str(&format!("{}case {}:\n", i2, quote(concrete)));
        output.push_str(&format!(
            "{}return {{ {}: {}, ...serialize{}(value) }};\n",
            i3,
            KIND_TAG,
            quote(concrete),
            profile.type_name(concrete)
        ));
    }
    output.push_str(&format!("{}}}\n", i1));
    output.push_str("}\n");
}

// =============================================================================
// Type Rendering
// =============================================================================

fn field_type(schema: &Schema, field: &Field, profile: &RenderProfile) -> String {
    match &field.ty {
        FieldType::Scalar(ty) => element_type(schema, ty, profile),
        FieldType::Sequence { element, .. } => profile.wrap_array(&element_type(schema, element, profile)),
    }
}

fn element_type(schema: &Schema, ty: &TypeRef, profile: &RenderProfile) -> String {
    match ty {
        TypeRef::Primitive(p) => profile.primitive(*p).to_string(),
        TypeRef::Definition(id) => profile.type_name(schema[*id].name()),
        TypeRef::Unresolved(name) => profile.type_name(name),
    }
}

fn parse_expr(schema: &Schema, ty: &TypeRef, value: &str, path: &str, profile: &RenderProfile) -> String {
    match ty {
        TypeRef::Primitive(p) => match p.integer_bounds() {
            Some((min, max)) => format!("expectInteger({}, {}, {}, {})", value, path, min, max),
            None => format!("{}({}, {})", primitive_check(*p), value, path),
        },
        TypeRef::Definition(id) => format!(
            "parse{}({}, {})",
            profile.type_name(schema[*id].name()),
            value,
            path
        ),
        TypeRef::Unresolved(name) => format!("parse{}({}, {})", profile.type_name(name), value, path),
    }
}

fn serialize_expr(schema: &Schema, ty: &TypeRef, value: &str, profile: &RenderProfile) -> String {
    match ty {
        TypeRef::Primitive(_) => value.to_string(),
        TypeRef::Definition(id) => format!(
            "serialize{}({})",
            profile.type_name(schema[*id].name()),
            value
        ),
        TypeRef::Unresolved(name) => format!("serialize{}({})", profile.type_name(name), value),
    }
}

fn primitive_check(primitive: Primitive) -> &'static str {
    match primitive {
        Primitive::Bool => "expectBoolean",
        Primitive::String => "expectString",
        _ => "expectNumber",
    }
}

/// Property name, quoted unless it is a plain identifier
fn property(name: &str) -> String {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        name.to_string()
    } else {
        quote(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn emit(value: serde_json::Value) -> String {
        let schema = Schema::from_description(&value).unwrap();
        TypeScriptEmitter.emit(&schema, &RenderProfile::typescript())
    }

    fn polymorphic_schema() -> serde_json::Value {
        json!({
            "namespace": "model",
            "enums": [{"name": "Kind", "members": [{"name": "A"}, {"name": "B"}]}],
            "structs": [
                {"name": "Type", "abstract": true, "key": ["ID"], "fields": [{"name": "ID", "type": "uint64"}]},
                {"name": "PrimitiveType", "inherits": "Type", "fields": [{"name": "Flavor", "type": "Kind"}]},
                {"name": "Binary", "fields": [
                    {"name": "Types", "sequence": {"type": "SortedVector", "elementType": "Type"}, "upcastable": true},
                    {"name": "Name", "type": "string", "optional": true, "doc": "display name"}
                ]}
            ]
        })
    }

    #[test]
    fn test_enum_ordinals() {
        let code = emit(json!({
            "namespace": "model",
            "enums": [{"name": "Kind", "members": [{"name": "A"}, {"name": "B"}]}]
        }));

        assert!(code.contains("export type Kind = \"A\" | \"B\";"));
        assert!(code.contains("export const KindMembers: readonly Kind[] = [\"A\", \"B\"];"));
        assert!(code.contains("return KindMembers.indexOf(value) + 0;"));
        assert!(code.contains("export function kindFromOrdinal(ordinal: number): Kind | undefined {"));
    }

    #[test]
    fn test_runtime_helpers_emitted_once() {
        let code = emit(polymorphic_schema());
        assert_eq!(code.matches("function expectObject(").count(), 1);
        assert_eq!(code.matches("function expectArray(").count(), 1);
    }

    #[test]
    fn test_interface() {
        let code = emit(polymorphic_schema());

        assert!(code.contains(
            "export interface Binary {\n  Types: Type[];\n  // display name\n  Name?: string;\n}"
        ));
        assert!(code.contains("export interface PrimitiveType {\n  ID: number;\n  Flavor: Kind;\n}"));
    }

    #[test]
    fn test_parse_and_serialize_functions() {
        let code = emit(polymorphic_schema());

        assert!(code.contains("ID: expectInteger(obj[\"ID\"], `${what}.ID`, 0, 18446744073709551615),"));
        assert!(code.contains("Flavor: parseKind(obj[\"Flavor\"], `${what}.Flavor`),"));
        assert!(code.contains(
            "Types: expectArray(obj[\"Types\"] ?? [], `${what}.Types`).map((item, index) => parseType(item, `${what}.Types[${index}]`)),"
        ));
        assert!(code.contains("if (value[\"Name\"] !== undefined) {"));
        assert!(code.contains("out[\"Types\"] = value[\"Types\"].map((item) => serializeType(item));"));
    }

    #[test]
    fn test_primitive_checks() {
        let code = emit(json!({
            "namespace": "model",
            "structs": [{"name": "Sample", "fields": [
                {"name": "Small", "type": "uint8"},
                {"name": "Signed", "type": "int16"},
                {"name": "Ratio", "type": "float64"},
                {"name": "Flag", "type": "bool"}
            ]}]
        }));

        assert!(code.contains("Small: expectInteger(obj[\"Small\"], `${what}.Small`, 0, 255),"));
        assert!(code.contains("Signed: expectInteger(obj[\"Signed\"], `${what}.Signed`, -32768, 32767),"));
        assert!(code.contains("Ratio: expectNumber(obj[\"Ratio\"], `${what}.Ratio`),"));
        assert!(code.contains("Flag: expectBoolean(obj[\"Flag\"], `${what}.Flag`),"));
        assert!(code.contains(
            "  if (typeof raw !== \"number\" || !Number.isInteger(raw) || raw < min || raw > max) {\n"
        ));
        assert_eq!(code.matches("function expectInteger(").count(), 1);
    }

    #[test]
    fn test_reserved_type_names() {
        let code = emit(json!({
            "namespace": "model",
            "enums": [{"name": "Record", "members": [{"name": "A"}]}],
            "structs": [{"name": "Holder", "fields": [{"name": "Value", "type": "Record"}]}]
        }));
        assert!(code.contains("export type Record_ = \"A\";"));
        assert!(code.contains("  Value: Record_;\n"));
        assert!(code.contains("Value: parseRecord_(obj[\"Value\"], `${what}.Value`),"));
        assert!(code.contains("const out: Record<string, unknown> = {};"));
    }

    #[test]
    fn test_polymorphic_union() {
        let code = emit(polymorphic_schema());

        assert!(code.contains("export type Type =\n  | ({ Kind: \"PrimitiveType\" } & PrimitiveType)\n;"));
        assert!(code.contains("return { Kind: \"PrimitiveType\", ...parsePrimitiveType(obj, what) };"));
        assert!(code.contains("return { Kind: \"PrimitiveType\", ...serializePrimitiveType(value) };"));
    }

    #[test]
    fn test_ordinal_base() {
        let schema = Schema::from_description(&json!({
            "namespace": "model",
            "enums": [{"name": "Kind", "members": [{"name": "A"}]}]
        }))
        .unwrap();
        let mut profile = RenderProfile::typescript();
        profile.ordinal_base = 1;
        let code = TypeScriptEmitter.emit(&schema, &profile);

        assert!(code.contains("return KindMembers.indexOf(value) + 1;"));
        assert!(code.contains("return KindMembers[ordinal - 1];"));
    }
}
