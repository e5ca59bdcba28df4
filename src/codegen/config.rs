//! Render Profiles
//!
//! Per-language rendering configuration: scalar type mappings, ordinal base,
//! output file naming and keyword escaping.
//!
//! Schema validation is config-free. Only emission reads a profile.

use serde::{Deserialize, Serialize};

use crate::model::Primitive;

// =============================================================================
// Language
// =============================================================================

/// Supported target languages
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
    #[value(name = "typescript")]
    TypeScript,
    Python,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Rust, Language::TypeScript, Language::Python];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::TypeScript => "typescript",
            Language::Python => "python",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Language::Rust => "rs",
            Language::TypeScript => "ts",
            Language::Python => "py",
        }
    }

    /// Line comment prefix, used for generated headers
    pub fn line_comment(&self) -> &'static str {
        match self {
            Language::Rust | Language::TypeScript => "//",
            Language::Python => "#",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Render Profile
// =============================================================================

/// Language-specific rendering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderProfile {
    /// Language identifier
    pub language: Language,

    /// Type mappings for schema primitives
    pub types: TypeMappings,

    /// Ordinal of the first member of every enum.
    ///
    /// Ordinals are part of the wire-visible contract; the value in force is
    /// printed in the header of every generated file.
    #[serde(default)]
    pub ordinal_base: u32,

    /// Output file stem; defaults to the schema namespace with `::`
    /// replaced by `_`
    #[serde(default)]
    pub file_stem: Option<String>,

    /// Spaces per indentation level
    #[serde(default = "default_indent")]
    pub indent: usize,
}

fn default_indent() -> usize {
    4
}

/// Type mappings for schema primitives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeMappings {
    pub boolean: String,
    pub string: String,
    pub int8: String,
    pub int16: String,
    pub int32: String,
    pub int64: String,
    pub uint8: String,
    pub uint16: String,
    pub uint32: String,
    pub uint64: String,
    pub float32: String,
    pub float64: String,
}

impl TypeMappings {
    fn uniform(boolean: &str, string: &str, integer: &str, float: &str) -> Self {
        Self {
            boolean: boolean.to_string(),
            string: string.to_string(),
            int8: integer.to_string(),
            int16: integer.to_string(),
            int32: integer.to_string(),
            int64: integer.to_string(),
            uint8: integer.to_string(),
            uint16: integer.to_string(),
            uint32: integer.to_string(),
            uint64: integer.to_string(),
            float32: float.to_string(),
            float64: float.to_string(),
        }
    }

    pub fn get(&self, primitive: Primitive) -> &str {
        match primitive {
            Primitive::Bool => &self.boolean,
            Primitive::String => &self.string,
            Primitive::Int8 => &self.int8,
            Primitive::Int16 => &self.int16,
            Primitive::Int32 => &self.int32,
            Primitive::Int64 => &self.int64,
            Primitive::Uint8 => &self.uint8,
            Primitive::Uint16 => &self.uint16,
            Primitive::Uint32 => &self.uint32,
            Primitive::Uint64 => &self.uint64,
            Primitive::Float32 => &self.float32,
            Primitive::Float64 => &self.float64,
        }
    }
}

// =============================================================================
// Default Profiles
// =============================================================================

impl RenderProfile {
    /// Default profile for `language`
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::Rust => Self::rust(),
            Language::TypeScript => Self::typescript(),
            Language::Python => Self::python(),
        }
    }

    pub fn rust() -> Self {
        Self {
            language: Language::Rust,
            types: TypeMappings {
                boolean: "bool".to_string(),
                string: "String".to_string(),
                int8: "i8".to_string(),
                int16: "i16".to_string(),
                int32: "i32".to_string(),
                int64: "i64".to_string(),
                uint8: "u8".to_string(),
                uint16: "u16".to_string(),
                uint32: "u32".to_string(),
                uint64: "u64".to_string(),
                float32: "f32".to_string(),
                float64: "f64".to_string(),
            },
            ordinal_base: 0,
            file_stem: None,
            indent: default_indent(),
        }
    }

    /// JSON numbers are IEEE doubles: 64-bit integers beyond 2^53 lose
    /// precision on this target.
    pub fn typescript() -> Self {
        Self {
            language: Language::TypeScript,
            types: TypeMappings::uniform("boolean", "string", "number", "number"),
            ordinal_base: 0,
            file_stem: None,
            indent: 2,
        }
    }

    pub fn python() -> Self {
        Self {
            language: Language::Python,
            types: TypeMappings::uniform("bool", "str", "int", "float"),
            ordinal_base: 0,
            file_stem: None,
            indent: default_indent(),
        }
    }
}

// =============================================================================
// Render Helpers
// =============================================================================

impl RenderProfile {
    /// Escape a keyword if needed
    pub fn escape_keyword(&self, name: &str) -> String {
        match self.language {
            // Raw identifiers are not allowed for these
            Language::Rust if RUST_RESERVED_PATHS.contains(&name) => format!("{name}_"),
            Language::Rust if RUST_KEYWORDS.contains(&name) => format!("r#{name}"),
            Language::TypeScript if TS_KEYWORDS.contains(&name) => format!("{name}_"),
            Language::Python if PYTHON_KEYWORDS.contains(&name) => format!("{name}_"),
            _ => name.to_string(),
        }
    }

    /// Escape a keyword, then append `_` if the result is one of `reserved`
    /// (names the emitter generates next to it)
    pub fn escape_reserved(&self, name: &str, reserved: &[&str]) -> String {
        let ident = self.escape_keyword(name);
        if reserved.contains(&ident.as_str()) {
            format!("{ident}_")
        } else {
            ident
        }
    }

    /// Identifier of a schema type, clear of the names generated code relies on
    pub fn type_name(&self, name: &str) -> String {
        let reserved = match self.language {
            Language::Rust => RUST_TYPE_NAMES,
            Language::TypeScript => TS_TYPE_NAMES,
            Language::Python => PYTHON_TYPE_NAMES,
        };
        self.escape_reserved(name, reserved)
    }

    pub fn primitive(&self, primitive: Primitive) -> &str {
        self.types.get(primitive)
    }

    /// Wrap a type to make it optional
    pub fn wrap_optional(&self, type_str: &str) -> String {
        match self.language {
            Language::Rust => format!("Option<{}>", type_str),
            // The property itself is marked optional
            Language::TypeScript => type_str.to_string(),
            Language::Python => format!("Optional[{}]", type_str),
        }
    }

    /// Wrap a type in a sequence container
    pub fn wrap_array(&self, type_str: &str) -> String {
        match self.language {
            Language::Rust => format!("Vec<{}>", type_str),
            Language::TypeScript => format!("{}[]", type_str),
            Language::Python => format!("List[{}]", type_str),
        }
    }

    /// Wrap a type in Box (Rust only, for polymorphic values)
    pub fn wrap_box(&self, type_str: &str) -> String {
        match self.language {
            Language::Rust => format!("Box<{}>", type_str),
            _ => type_str.to_string(),
        }
    }

    /// Indentation for `level`
    pub fn indent(&self, level: usize) -> String {
        " ".repeat(self.indent * level)
    }

    /// File name of the generated source for `namespace`
    pub fn file_name(&self, namespace: &str) -> String {
        let stem = self
            .file_stem
            .clone()
            .unwrap_or_else(|| namespace.replace("::", "_"));
        format!("{}.{}", stem, self.language.extension())
    }
}

// =============================================================================
// Keywords
// =============================================================================

const RUST_RESERVED_PATHS: &[&str] = &["self", "Self", "super", "crate"];

const RUST_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod",
    "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct",
    "super", "trait", "true", "type", "unsafe", "use", "where", "while",
    "async", "await", "dyn", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "try",
];

const TS_KEYWORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "export", "extends", "false",
    "finally", "for", "function", "if", "import", "in", "instanceof", "new",
    "null", "return", "super", "switch", "this", "throw", "true", "try",
    "typeof", "var", "void", "while", "with", "implements", "interface",
    "let", "package", "private", "protected", "public", "static", "yield",
];

// Prelude and runtime names referenced by generated code
const RUST_TYPE_NAMES: &[&str] = &[
    "Option", "Some", "None", "Box", "Vec", "String", "Serialize", "Deserialize",
    "bool", "char", "str", "u8", "u16", "u32", "u64", "u128", "usize", "i8",
    "i16", "i32", "i64", "i128", "isize", "f32", "f64",
];

const TS_TYPE_NAMES: &[&str] = &[
    "any", "bigint", "boolean", "never", "number", "object", "string", "symbol",
    "undefined", "unknown", "Array", "Error", "JSON", "Number", "Record",
    "expectArray", "expectBoolean", "expectInteger", "expectNumber",
    "expectObject", "expectString",
];

const PYTHON_TYPE_NAMES: &[&str] = &[
    "Any", "ClassVar", "Dict", "List", "Optional", "dataclasses", "enum",
    "bool", "float", "getattr", "int", "isinstance", "len", "list", "str",
    "type", "ValueError", "_expect_bool", "_expect_float", "_expect_int",
    "_expect_list", "_expect_str",
];

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break",
    "class", "continue", "def", "del", "elif", "else", "except", "finally",
    "for", "from", "global", "if", "import", "in", "is", "lambda", "nonlocal",
    "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_profile_defaults() {
        let profile = RenderProfile::rust();
        assert_eq!(profile.primitive(Primitive::String), "String");
        assert_eq!(profile.primitive(Primitive::Uint64), "u64");
        assert_eq!(profile.ordinal_base, 0);
    }

    #[test]
    fn test_typescript_profile_defaults() {
        let profile = RenderProfile::typescript();
        assert_eq!(profile.primitive(Primitive::Int64), "number");
        assert_eq!(profile.primitive(Primitive::Bool), "boolean");
        assert_eq!(profile.indent(2), "    ");
    }

    #[test]
    fn test_keyword_escape() {
        let rust = RenderProfile::rust();
        assert_eq!(rust.escape_keyword("type"), "r#type");
        assert_eq!(rust.escape_keyword("self"), "self_");
        assert_eq!(rust.escape_keyword("name"), "name");

        let python = RenderProfile::python();
        assert_eq!(python.escape_keyword("None"), "None_");
        assert_eq!(python.escape_keyword("Entry"), "Entry");
    }

    #[test]
    fn test_reserved_names() {
        let python = RenderProfile::python();
        assert_eq!(python.escape_reserved("ordinal", &["ordinal"]), "ordinal_");
        assert_eq!(python.escape_reserved("None", &["None_"]), "None__");
        assert_eq!(python.type_name("List"), "List_");
        assert_eq!(python.type_name("Binary"), "Binary");

        let rust = RenderProfile::rust();
        assert_eq!(rust.escape_reserved("MEMBERS", &["MEMBERS"]), "MEMBERS_");
        assert_eq!(rust.type_name("Option"), "Option_");
        assert_eq!(rust.type_name("Self"), "Self_");

        let typescript = RenderProfile::typescript();
        assert_eq!(typescript.type_name("string"), "string_");
        assert_eq!(typescript.type_name("class"), "class_");
    }

    #[test]
    fn test_wrappers() {
        let rust = RenderProfile::rust();
        assert_eq!(rust.wrap_optional("String"), "Option<String>");
        assert_eq!(rust.wrap_array("u8"), "Vec<u8>");
        assert_eq!(rust.wrap_box("Type"), "Box<Type>");

        let python = RenderProfile::python();
        assert_eq!(python.wrap_optional("int"), "Optional[int]");
        assert_eq!(python.wrap_box("Type"), "Type");
    }

    #[test]
    fn test_file_name() {
        let mut rust = RenderProfile::rust();
        assert_eq!(rust.file_name("model"), "model.rs");
        assert_eq!(rust.file_name("revng::model"), "revng_model.rs");
        rust.file_stem = Some("generated".to_string());
        assert_eq!(rust.file_name("model"), "generated.rs");
    }
}
