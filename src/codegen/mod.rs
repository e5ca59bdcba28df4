//! Code Generation
//!
//! Renders a resolved [`Schema`] into target-language source.
//!
//! Architecture:
//! - RenderProfile: per-language configuration (type mappings, ordinal base)
//! - Emitter: one implementation per language, pure function of schema + profile
//! - GeneratedOutput: the files to write, in memory
//!
//! Emitters never see raw descriptions and never fail: every schema error is
//! raised while the schema is built, and [`generate`] checks the profile's
//! ordinal range against the schema before emitting. Output only depends on
//! the schema and the profile (declaration order, no timestamps), so
//! regenerating an unchanged schema is byte-identical.

pub mod config;
pub mod names;
pub mod python;
pub mod rust;
pub mod typescript;

use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{DefId, StructDefinition, TypeDefinition};
use crate::schema::Schema;

pub use crate::schema::KIND_TAG;
pub use config::{Language, RenderProfile, TypeMappings};

// =============================================================================
// Emitter
// =============================================================================

/// A target-language code emitter
pub trait Emitter {
    fn language(&self) -> Language;

    /// Render the whole schema into a single source file
    fn emit(&self, schema: &Schema, profile: &RenderProfile) -> String;
}

/// The emitter for `language`
pub fn emitter(language: Language) -> Box<dyn Emitter> {
    match language {
        Language::Rust => Box::new(rust::RustEmitter),
        Language::TypeScript => Box::new(typescript::TypeScriptEmitter),
        Language::Python => Box::new(python::PythonEmitter),
    }
}

// =============================================================================
// Generated Output
// =============================================================================

/// One generated source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Path relative to the output directory
    pub path: PathBuf,
    pub content: String,
}

/// Output from code generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedOutput {
    pub language: Language,
    pub files: Vec<GeneratedFile>,
    /// Number of type declarations generated
    pub type_count: usize,
}

// =============================================================================
// Public API
// =============================================================================

/// Generate code for `profile.language`.
///
/// Fails when an enum's ordinals would not fit in a `u32` under
/// `profile.ordinal_base`.
pub fn generate(schema: &Schema, profile: &RenderProfile) -> Result<GeneratedOutput> {
    check_ordinals(schema, profile)?;

    let emitter = emitter(profile.language);
    let language = emitter.language();
    let content = emitter.emit(schema, profile);
    let path = PathBuf::from(profile.file_name(schema.namespace()));
    let type_count = schema.len();

    info!(
        language = %language,
        file = %path.display(),
        types = type_count,
        "generated"
    );

    Ok(GeneratedOutput {
        language,
        files: vec![GeneratedFile { path, content }],
        type_count,
    })
}

/// Generate code for several targets at once
pub fn generate_all(schema: &Schema, profiles: &[RenderProfile]) -> Result<Vec<GeneratedOutput>> {
    profiles.iter().map(|profile| generate(schema, profile)).collect()
}

fn check_ordinals(schema: &Schema, profile: &RenderProfile) -> Result<()> {
    let base = profile.ordinal_base;
    match schema.enums().find(|(_, e)| e.last_ordinal(base).is_none()) {
        Some((_, e)) => Err(Error::OrdinalOverflow {
            element: e.namespace().to_string(),
            base,
        }),
        None => Ok(()),
    }
}

// =============================================================================
// Shared emission helpers
// =============================================================================

/// Header comment stating provenance and the ordinal contract
pub(crate) fn header(schema: &Schema, profile: &RenderProfile) -> String {
    let c = profile.language.line_comment();
    let mut output = String::new();
    output.push_str(&format!(
        "{c} Generated by tupletree-codegen from schema `{}` - DO NOT EDIT\n",
        schema.namespace()
    ));
    output.push_str(&format!("{c}\n"));
    output.push_str(&format!(
        "{c} Wire encoding: JSON objects keyed by schema field names. Optional fields\n"
    ));
    output.push_str(&format!(
        "{c} and empty sequences are omitted. Enums are encoded by member name.\n"
    ));
    output.push_str(&format!(
        "{c} Polymorphic values carry a `{KIND_TAG}` field naming the concrete struct.\n"
    ));
    output.push_str(&format!(
        "{c} Enum ordinals follow declaration order starting at {}.\n",
        profile.ordinal_base
    ));
    output
}

/// Abstract structs that have at least one concrete descendant, in
/// declaration order. Each gets a polymorphic wrapper type.
pub(crate) fn polymorphic_bases(schema: &Schema) -> Vec<(DefId, &StructDefinition)> {
    schema
        .structs()
        .filter(|(id, s)| s.is_abstract() && !schema.concrete_descendants(*id).is_empty())
        .collect()
}

/// Whether instances of `id` appear on the wire inside a polymorphic value
/// and therefore carry the `Kind` tag
pub(crate) fn is_tagged(schema: &Schema, id: DefId) -> bool {
    schema.ancestry(id).len() > 1
}

/// Emission order: enums in declaration order, then structs with bases first
pub(crate) fn emission_order(schema: &Schema) -> Vec<DefId> {
    let mut order: Vec<DefId> = schema.enums().map(|(id, _)| id).collect();
    order.extend_from_slice(schema.inheritance_order());
    debug!(definitions = order.len(), "emission order computed");
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::from_description(&json!({
            "namespace": "model",
            "enums": [{"name": "Kind", "members": [{"name": "A"}, {"name": "B", "doc": "second"}]}],
            "structs": [
                {"name": "Leaf", "inherits": "Node", "fields": [{"name": "Value", "type": "Kind"}]},
                {"name": "Node", "abstract": true, "fields": [{"name": "ID", "type": "uint64"}]},
                {"name": "Unused", "abstract": true}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_generate_is_idempotent() {
        let schema = schema();
        for language in Language::ALL {
            let profile = RenderProfile::for_language(language);
            let first = generate(&schema, &profile).unwrap();
            let second = generate(&schema, &profile).unwrap();
            assert_eq!(first, second, "{language} output differs between runs");
        }
    }

    #[test]
    fn test_file_names() {
        let schema = schema();
        let outputs = generate_all(&schema, &Language::ALL.map(RenderProfile::for_language)).unwrap();
        let paths: Vec<_> = outputs.iter().map(|o| o.files[0].path.clone()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("model.rs"), PathBuf::from("model.ts"), PathBuf::from("model.py")]
        );
        assert!(outputs.iter().all(|o| o.type_count == 4));
        let languages: Vec<_> = outputs.iter().map(|o| o.language).collect();
        assert_eq!(languages, Language::ALL.to_vec());
    }

    #[test]
    fn test_ordinal_base_overflow_is_rejected() {
        let schema = schema();
        for language in Language::ALL {
            let mut profile = RenderProfile::for_language(language);

            profile.ordinal_base = u32::MAX;
            let err = generate(&schema, &profile).unwrap_err();
            assert!(matches!(
                err,
                Error::OrdinalOverflow { ref element, base } if element == "model::Kind" && base == u32::MAX
            ));

            // `Kind` has two members: the last one takes u32::MAX
            profile.ordinal_base = u32::MAX - 1;
            let output = generate(&schema, &profile).unwrap();
            assert!(output.files[0].content.contains("starting at 4294967294."));
        }
    }

    #[test]
    fn test_header_documents_ordinal_base() {
        let schema = schema();
        let mut profile = RenderProfile::python();
        profile.ordinal_base = 1;
        let text = header(&schema, &profile);
        assert!(text.starts_with("# Generated by tupletree-codegen"));
        assert!(text.contains("starting at 1."));
    }

    #[test]
    fn test_polymorphic_helpers() {
        let schema = schema();
        let bases: Vec<_> = polymorphic_bases(&schema).into_iter().map(|(_, s)| s.name().to_string()).collect();
        assert_eq!(bases, vec!["Node"]);
        assert!(is_tagged(&schema, schema.resolve_id("Leaf").unwrap()));
        assert!(!is_tagged(&schema, schema.resolve_id("Node").unwrap()));

        let order: Vec<_> = emission_order(&schema)
            .into_iter()
            .map(|id| format!("{}:{}", schema[id].kind_name(), schema[id].name()))
            .collect();
        assert_eq!(order, vec!["enum:Kind", "struct:Node", "struct:Leaf", "struct:Unused"]);
    }
}
