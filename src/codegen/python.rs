//! Python Code Emitter
//!
//! Generates `enum.Enum` classes and keyword-only dataclasses that mirror
//! the schema's inheritance. Every class converts to and from the wire dict
//! with `to_dict` / `from_dict`; abstract classes dispatch `from_dict` on the
//! `Kind` tag.

use crate::model::{
    DefId, Definition, EnumDefinition, Field, FieldType, Primitive, StructDefinition, TypeDefinition, TypeRef,
};
use crate::schema::{Schema, KIND_TAG};

use super::names::{quote, render_doc};
use super::{emission_order, header, is_tagged, Emitter, Language, RenderProfile};

pub struct PythonEmitter;

/// Members `enum.Enum` provides or the emitter generates on every enum
const ENUM_ITEMS: &[&str] = &["name", "value", "ordinal", "from_ordinal", "to_json", "from_json"];

/// Methods and class variables generated on every dataclass, the `__init__`
/// receiver, and module names the class body refers to
const CLASS_ITEMS: &[&str] = &["to_dict", "from_dict", "to_tagged_dict", "_kind", "self", "dataclasses", "list"];

impl Emitter for PythonEmitter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn emit(&self, schema: &Schema, profile: &RenderProfile) -> String {
        let mut output = header(schema, profile);
        output.push('\n');
        output.push_str("from __future__ import annotations\n\n");
        output.push_str("import dataclasses\n");
        output.push_str("import enum\n");
        output.push_str("from typing import Any, ClassVar, Dict, List, Optional\n");
        emit_runtime(&mut output, profile);

        for id in emission_order(schema) {
            output.push_str("\n\n");
            match &schema[id] {
                Definition::Enum(e) => emit_enum(&mut output, e, profile),
                Definition::Struct(s) => emit_class(&mut output, schema, id, s, profile),
            }
        }

        output
    }
}

// =============================================================================
// Runtime Helpers
// =============================================================================

/// Wire checks for scalar values, emitted once per file. `bool` is a
/// subclass of `int` in Python and is rejected where a number is expected.
fn emit_runtime(output: &mut String, profile: &RenderProfile) {
    let i1 = profile.indent(1);
    let i2 = profile.indent(2);

    let checks: [(&str, &str, &str, &str, &str); 5] = [
        ("_expect_bool", "", "bool", "not isinstance(raw, bool)", "a boolean"),
        ("_expect_str", "", "str", "not isinstance(raw, str)", "a string"),
        (
            "_expect_int",
            ", low: int, high: int",
            "int",
            "isinstance(raw, bool) or not isinstance(raw, int) or not low <= raw <= high",
            "an integer in [{low}, {high}]",
        ),
        (
            "_expect_float",
            "",
            "float",
            "isinstance(raw, bool) or not isinstance(raw, (int, float))",
            "a number",
        ),
        ("_expect_list", "", "List[Any]", "not isinstance(raw, list)", "a list"),
    ];

    for (function, extra, ty, test, expected) in checks {
        output.push_str("\n\n");
        output.push_str(&format!("def {}(raw: Any, what: str{}) -> {}:\n", function, extra, ty));
        output.push_str(&format!("{}if {}:\n", i1, test));
        output.push_str(&format!(
            "{}raise ValueError(f\"{{what}}: expected {}, got {{raw!r}}\")\n",
            i2, expected
        ));
        let result = if function == "_expect_float" { "float(raw)" } else { "raw" };
        output.push_str(&format!("{}return {}\n", i1, result));
    }
}

// =============================================================================
// Enum Emission
// =============================================================================

fn emit_enum(output: &mut String, e: &EnumDefinition, profile: &RenderProfile) {
    let name = profile.type_name(e.name());
    let i1 = profile.indent(1);
    let i2 = profile.indent(2);
    let i3 = profile.indent(3);
    let base = profile.ordinal_base;

    output.push_str(&format!("class {}(enum.Enum):\n", name));
    emit_docstring(output, e.doc(), &i1);
    for member in e.members() {
        render_doc(output, member.doc.as_deref(), &i1, "# ");
        output.push_str(&format!(
            "{}{} = {}\n",
            i1,
            profile.escape_reserved(&member.name, ENUM_ITEMS),
            quote(&member.name)
        ));
    }

    output.push('\n');
    output.push_str(&format!("{}@property\n", i1));
    output.push_str(&format!("{}def ordinal(self) -> int:\n", i1));
    output.push_str(&format!("{}return list(type(self)).index(self) + {}\n", i2, base));

    output.push('\n');
    output.push_str(&format!("{}@classmethod\n", i1));
    output.push_str(&format!("{}def from_ordinal(cls, ordinal: int) -> {}:\n", i1, name));
    output.push_str(&format!("{}members = list(cls)\n", i2));
    output.push_str(&format!("{}index = ordinal - {}\n", i2, base));
    output.push_str(&format!("{}if not 0 <= index < len(members):\n", i2));
    output.push_str(&format!(
        "{}raise ValueError(f\"invalid {} ordinal: {{ordinal}}\")\n",
        i3, name
    ));
    output.push_str(&format!("{}return members[index]\n", i2));

    output.push('\n');
    output.push_str(&format!("{}def to_json(self) -> str:\n", i1));
    output.push_str(&format!("{}return self.value\n", i2));

    output.push('\n');
    output.push_str(&format!("{}@classmethod\n", i1));
    output.push_str(&format!("{}def from_json(cls, raw: Any) -> {}:\n", i1, name));
    output.push_str(&format!("{}return cls(raw)\n", i2));
}

// =============================================================================
// Class Emission
// =============================================================================

fn emit_class(output: &mut String, schema: &Schema, id: DefId, s: &StructDefinition, profile: &RenderProfile) {
    let name = profile.type_name(s.name());
    let i1 = profile.indent(1);
    let i2 = profile.indent(2);

    output.push_str("@dataclasses.dataclass(kw_only=True)\n");
    match s.base() {
        Some(base) => output.push_str(&format!(
            "class {}({}):\n",
            name,
            profile.type_name(schema[base].name())
        )),
        None => output.push_str(&format!("class {}:\n", name)),
    }
    emit_docstring(output, s.doc(), &i1);

    for field in s.fields() {
        render_doc(output, field.doc.as_deref(), &i1, "# ");
        let ident = field_ident(field, profile);
        let ty = field_type(schema, field, profile);
        match &field.ty {
            FieldType::Sequence { .. } => output.push_str(&format!(
                "{}{}: {} = dataclasses.field(default_factory=list)\n",
                i1, ident, ty
            )),
            FieldType::Scalar(_) if field.optional => {
                output.push_str(&format!("{}{}: {} = None\n", i1, ident, ty))
            }
            FieldType::Scalar(_) => output.push_str(&format!("{}{}: {}\n", i1, ident, ty)),
        }
    }
    if !s.is_abstract() && is_tagged(schema, id) {
        output.push_str(&format!("{}_kind: ClassVar[str] = {}\n", i1, quote(s.name())));
    }

    let fields = schema.all_fields(id);

    output.push('\n');
    output.push_str(&format!("{}def to_dict(self) -> Dict[str, Any]:\n", i1));
    output.push_str(&format!("{}result: Dict[str, Any] = {{}}\n", i2));
    for field in &fields {
        emit_to_dict_field(output, schema, field, profile);
    }
    output.push_str(&format!("{}return result\n", i2));

    if s.is_abstract() {
        emit_abstract_methods(output, schema, id, &name, profile);
        return;
    }

    output.push('\n');
    output.push_str(&format!("{}@classmethod\n", i1));
    output.push_str(&format!("{}def from_dict(cls, raw: Dict[str, Any]) -> {}:\n", i1, name));
    output.push_str(&format!("{}return cls(\n", i2));
    for field in &fields {
        let key = quote(&field.name);
        let what = format!("{}.{}", s.name(), field.name);
        let value = match &field.ty {
            FieldType::Scalar(ty) if field.optional => format!(
                "None if raw.get({key}) is None else {}",
                from_json(schema, ty, &format!("raw[{key}]"), &what, profile)
            ),
            FieldType::Scalar(ty) => from_json(schema, ty, &format!("raw[{key}]"), &what, profile),
            FieldType::Sequence { element, .. } => format!(
                "[{} for item in _expect_list(raw.get({key}, []), {})]",
                from_json(schema, element, "item", &format!("{what}[]"), profile),
                quote(&what)
            ),
        };
        output.push_str(&format!(
            "{}{}={},\n",
            profile.indent(3),
            field_ident(field, profile),
            value
        ));
    }
    output.push_str(&format!("{})\n", i2));
}

fn emit_to_dict_field(output: &mut String, schema: &Schema, field: &Field, profile: &RenderProfile) {
    let i2 = profile.indent(2);
    let i3 = profile.indent(3);
    let key = quote(&field.name);
    let attr = format!("self.{}", field_ident(field, profile));

    match &field.ty {
        FieldType::Scalar(ty) if field.optional => {
            output.push_str(&format!("{}if {} is not None:\n", i2, attr));
            output.push_str(&format!(
                "{}result[{}] = {}\n",
                i3,
                key,
                to_json(schema, ty, field.upcastable, &attr)
            ));
        }
        FieldType::Scalar(ty) => {
            output.push_str(&format!(
                "{}result[{}] = {}\n",
                i2,
                key,
                to_json(schema, ty, field.upcastable, &attr)
            ));
        }
        FieldType::Sequence { element, .. } => {
            output.push_str(&format!("{}if {}:\n", i2, attr));
            output.push_str(&format!(
                "{}result[{}] = [{} for item in {}]\n",
                i3,
                key,
                to_json(schema, element, field.upcastable, "item"),
                attr
            ));
        }
    }
}

/// `to_tagged_dict` and a `from_dict` dispatching on the tag
fn emit_abstract_methods(output: &mut String, schema: &Schema, id: DefId, name: &str, profile: &RenderProfile) {
    let i1 = profile.indent(1);
    let i2 = profile.indent(2);
    let i3 = profile.indent(3);
    let tag = quote(KIND_TAG);

    output.push('\n');
    output.push_str(&format!("{}def to_tagged_dict(self) -> Dict[str, Any]:\n", i1));
    output.push_str(&format!(
        "{}return {{{}: getattr(self, \"_kind\"), **self.to_dict()}}\n",
        i2, tag
    ));

    output.push('\n');
    output.push_str(&format!("{}@classmethod\n", i1));
    output.push_str(&format!("{}def from_dict(cls, raw: Dict[str, Any]) -> {}:\n", i1, name));
    output.push_str(&format!("{}kind = raw.get({})\n", i2, tag));
    for descendant in schema.concrete_descendants(id) {
        let concrete = schema[descendant].name();
        output.push_str(&format!("{}if kind == {}:\n", i2, quote(concrete)));
        output.push_str(&format!(
            "{}return {}.from_dict(raw)\n",
            i3,
            profile.type_name(concrete)
        ));
    }
    output.push_str(&format!(
        "{}raise ValueError(f\"unknown {} kind: {{kind!r}}\")\n",
        i2, name
    ));
}

fn emit_docstring(output: &mut String, doc: Option<&str>, indent: &str) {
    if let Some(doc) = doc {
        let escaped = doc.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"");
        let mut lines = escaped.lines();
        if let Some(first) = lines.next() {
            output.push_str(&format!("{}\"\"\"{}", indent, first.trim_end()));
            let rest: Vec<&str> = lines.collect();
            if rest.is_empty() {
                output.push_str("\"\"\"\n");
            } else {
                output.push('\n');
                for line in rest {
                    let line = line.trim_end();
                    if line.is_empty() {
                        output.push('\n');
                    } else {
                        output.push_str(&format!("{}{}\n", indent, line));
                    }
                }
                output.push_str(&format!("{}\"\"\"\n", indent));
            }
            output.push('\n');
        }
    }
}

// =============================================================================
// Type Rendering
// =============================================================================

fn field_ident(field: &Field, profile: &RenderProfile) -> String {
    profile.escape_reserved(&field.name, CLASS_ITEMS)
}

fn field_type(schema: &Schema, field: &Field, profile: &RenderProfile) -> String {
    match &field.ty {
        FieldType::Scalar(ty) => {
            let rendered = element_type(schema, ty, profile);
            if field.optional {
                profile.wrap_optional(&rendered)
            } else {
                rendered
            }
        }
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

fn to_json(schema: &Schema, ty: &TypeRef, upcastable: bool, value: &str) -> String {
    match ty {
        TypeRef::Primitive(_) | TypeRef::Unresolved(_) => value.to_string(),
        TypeRef::Definition(id) => match &schema[*id] {
            Definition::Enum(_) => format!("{}.to_json()", value),
            Definition::Struct(_) if upcastable => format!("{}.to_tagged_dict()", value),
            Definition::Struct(_) => format!("{}.to_dict()", value),
        },
    }
}

/// Decode `value`; `what` names it in error messages
fn from_json(schema: &Schema, ty: &TypeRef, value: &str, what: &str, profile: &RenderProfile) -> String {
    match ty {
        TypeRef::Primitive(p) => match p.integer_bounds() {
            Some((low, high)) => format!("_expect_int({}, {}, {}, {})", value, quote(what), low, high),
            None => {
                let check = match p {
                    Primitive::Bool => "_expect_bool",
                    Primitive::String => "_expect_str",
                    _ => "_expect_float",
                };
                format!("{}({}, {})", check, value, quote(what))
            }
        },
        TypeRef::Unresolved(_) => value.to_string(),
        TypeRef::Definition(id) => {
            let name = profile.type_name(schema[*id].name());
            match &schema[*id] {
                Definition::Enum(_) => format!("{}.from_json({})", name, value),
                Definition::Struct(_) => format!("{}.from_dict({})", name, value),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn emit(value: serde_json::Value) -> String {
        let schema = Schema::from_description(&value).unwrap();
        PythonEmitter.emit(&schema, &RenderProfile::python())
    }

    fn model() -> serde_json::Value {
        json!({
            "namespace": "model",
            "enums": [{"name": "Kind", "doc": "Flavors", "members": [{"name": "A"}, {"name": "None"}]}],
            "structs": [
                {"name": "Type", "abstract": true, "key": ["ID"], "fields": [{"name": "ID", "type": "uint64"}]},
                {"name": "PrimitiveType", "inherits": "Type", "fields": [{"name": "Flavor", "type": "Kind"}]},
                {"name": "Binary", "fields": [
                    {"name": "Types", "sequence": {"type": "SortedVector", "elementType": "Type"}, "upcastable": true},
                    {"name": "Name", "type": "string", "optional": true}
                ]}
            ]
        })
    }

    #[test]
    fn test_enum_class() {
        let code = emit(model());

        assert!(code.contains("class Kind(enum.Enum):\n    \"\"\"Flavors\"\"\"\n\n    A = \"A\"\n    None_ = \"None\"\n"));
        assert!(code.contains("return list(type(self)).index(self) + 0\n"));
        assert!(code.contains("raise ValueError(f\"invalid Kind ordinal: {ordinal}\")"));
    }

    #[test]
    fn test_dataclass_inheritance() {
        let code = emit(model());

        assert!(code.contains(
            "@dataclasses.dataclass(kw_only=True)\nclass PrimitiveType(Type):\n    Flavor: Kind\n    _kind: ClassVar[str] = \"PrimitiveType\"\n"
        ));
        assert!(code.contains("    Types: List[Type] = dataclasses.field(default_factory=list)\n"));
        assert!(code.contains("    Name: Optional[str] = None\n"));
    }

    #[test]
    fn test_conversions() {
        let code = emit(model());

        assert!(code.contains("result[\"Flavor\"] = self.Flavor.to_json()"));
        assert!(code.contains("result[\"Types\"] = [item.to_tagged_dict() for item in self.Types]"));
        assert!(code.contains("Flavor=Kind.from_json(raw[\"Flavor\"]),"));
        assert!(code.contains(
            "Types=[Type.from_dict(item) for item in _expect_list(raw.get(\"Types\", []), \"Binary.Types\")],"
        ));
        assert!(code.contains("Name=None if raw.get(\"Name\") is None else _expect_str(raw[\"Name\"], \"Binary.Name\"),"));
    }

    #[test]
    fn test_primitive_checks() {
        let code = emit(model());

        assert!(code.contains("ID=_expect_int(raw[\"ID\"], \"PrimitiveType.ID\", 0, 18446744073709551615),"));
        assert!(code.contains(
            "def _expect_int(raw: Any, what: str, low: int, high: int) -> int:\n    if isinstance(raw, bool) or not isinstance(raw, int) or not low <= raw <= high:\n"
        ));
        assert!(code.contains("def _expect_float(raw: Any, what: str) -> float:\n    if isinstance(raw, bool) or not isinstance(raw, (int, float)):\n"));
        assert!(code.contains("    return float(raw)\n"));
        assert_eq!(code.matches("def _expect_str(").count(), 1);
    }

    #[test]
    fn test_generated_names_are_not_shadowed() {
        let code = emit(json!({
            "namespace": "model",
            "enums": [{"name": "List", "members": [{"name": "ordinal"}, {"name": "None"}, {"name": "value"}]}],
            "structs": [{"name": "Entry", "fields": [
                {"name": "to_dict", "type": "bool"},
                {"name": "Items", "type": "List"}
            ]}]
        }));

        assert!(code.contains("class List_(enum.Enum):\n    ordinal_ = \"ordinal\"\n    None_ = \"None\"\n    value_ = \"value\"\n"));
        assert!(code.contains("    to_dict_: bool\n    Items: List_\n"));
        assert!(code.contains("result[\"to_dict\"] = self.to_dict_"));
        assert!(code.contains("to_dict_=_expect_bool(raw[\"to_dict\"], \"Entry.to_dict\"),"));
        assert!(code.contains("Items=List_.from_json(raw[\"Items\"]),"));
    }

    #[test]
    fn test_abstract_dispatch() {
        let code = emit(model());

        assert!(code.contains("        kind = raw.get(\"Kind\")\n        if kind == \"PrimitiveType\":\n            return PrimitiveType.from_dict(raw)\n"));
        assert!(code.contains("raise ValueError(f\"unknown Type kind: {kind!r}\")"));
    }

    #[test]
    fn test_multiline_docstring() {
        let mut out = String::new();
        emit_docstring(&mut out, Some("First line\n\nMore"), "    ");
        assert_eq!(out, "    \"\"\"First line\n\n    More\n    \"\"\"\n\n");
    }
}
