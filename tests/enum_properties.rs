//! Enum definition properties through the public API

use serde_json::json;
use tupletree_codegen::codegen::{generate, Language, RenderProfile};
use tupletree_codegen::model::{EnumDefinition, StructDefinition};
use tupletree_codegen::{Schema, SchemaError, TypeDefinition};

fn kind() -> serde_json::Value {
    json!({"name": "Kind", "members": [{"name": "A"}, {"name": "B", "doc": "second"}]})
}

#[test]
fn test_concrete_enum() {
    let e = EnumDefinition::from_description(&kind(), "model").unwrap();

    assert_eq!(e.namespace(), "model::Kind");
    assert_eq!(e.user_namespace(), "model::Kind");
    assert_eq!(e.qualified_type_name(), "model::Kind::Values");
    assert_eq!(e.ordinal_of("A", 0), Some(0));
    assert_eq!(e.ordinal_of("B", 0), Some(1));
    assert_eq!(e.member_by_ordinal(1, 0).unwrap().doc.as_deref(), Some("second"));
}

#[test]
fn test_roundtrip_preserves_order_and_docs() {
    let e = EnumDefinition::from_description(&kind(), "model").unwrap();
    assert_eq!(e.to_description(), kind());
    assert_eq!(EnumDefinition::from_description(&e.to_description(), "model").unwrap(), e);
}

#[test]
fn test_nested_namespace_qualified_names() {
    let e = EnumDefinition::from_description(&json!({"name": "Foo", "members": [{"name": "X"}]}), "NS").unwrap();
    assert_eq!(e.namespace(), "NS::Foo");
    assert_eq!(e.qualified_type_name(), "NS::Foo::Values");

    let s = StructDefinition::from_description(&json!({"name": "Foo"}), "NS", "NS").unwrap();
    assert_eq!(s.qualified_type_name(), "NS::Foo");
}

#[test]
fn test_invalid_enums() {
    let cases = [
        json!({"name": "Kind"}),
        json!({"name": "Kind", "members": []}),
        json!({"name": "Kind", "members": [{"name": "A", "value": 3}]}),
        json!({"name": "Kind", "members": [{"name": "A"}, {"name": "A"}]}),
        json!({"name": "Kind", "members": [{"name": "A"}], "flags": true}),
        json!({"name": "Kind", "members": [{"name": "None"}, {"name": "None_"}]}),
    ];

    let errors: Vec<SchemaError> = cases
        .iter()
        .map(|case| EnumDefinition::from_description(case, "model").unwrap_err())
        .collect();

    assert!(matches!(errors[0], SchemaError::MissingKey { ref key, .. } if key == "members"));
    assert!(matches!(errors[1], SchemaError::EmptyCollection { .. }));
    assert!(matches!(errors[2], SchemaError::UnexpectedKey { ref key, .. } if key == "value"));
    assert!(matches!(errors[3], SchemaError::DuplicateMember { ref member, .. } if member == "A"));
    assert!(matches!(errors[4], SchemaError::UnexpectedKey { ref key, .. } if key == "flags"));
    assert!(matches!(errors[5], SchemaError::DuplicateMember { ref element, ref member } if element == "model::Kind" && member == "None_"));
}

#[test]
fn test_emission_twice_is_identical() {
    let schema = Schema::from_description(&json!({"namespace": "model", "enums": [kind()]})).unwrap();
    for language in Language::ALL {
        let profile = RenderProfile::for_language(language);
        assert_eq!(generate(&schema, &profile).unwrap(), generate(&schema, &profile).unwrap());
    }
}
