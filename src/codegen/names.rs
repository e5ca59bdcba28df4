//! Naming helpers shared by the emitters
//!
//! Schema names are kept verbatim on the wire. Emitters may only change how
//! a name is spelled in generated code, and must then map it back to the
//! schema name when (de)serializing.

use std::collections::HashSet;

use super::config::RenderProfile;
use crate::model::Field;

/// Convert to snake_case (`CustomName` -> `custom_name`, `ID` -> `id`)
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;

    for c in s.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else if c == '-' || c == ' ' {
            result.push('_');
            prev_lower = false;
        } else {
            result.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }

    result
}

/// Lower the first character (`Kind` -> `kind`)
pub fn to_lower_camel(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Rust field identifiers for `fields`, in order.
///
/// Names are converted to snake_case unless two fields would collapse onto
/// the same identifier, in which case the schema names are kept for the whole
/// struct. Identifiers listed in `reserved` get a trailing `_`. Schema names
/// stay distinct once escaped: the schema rejects names that only differ by
/// trailing underscores.
pub fn rust_field_names(fields: &[&Field], reserved: &[&str], profile: &RenderProfile) -> Vec<String> {
    let spell = |names: Vec<String>| -> Vec<String> {
        names.iter().map(|name| profile.escape_reserved(name, reserved)).collect()
    };

    let snake = spell(fields.iter().map(|f| to_snake_case(&f.name)).collect());
    let unique: HashSet<&String> = snake.iter().collect();
    if unique.len() == snake.len() {
        snake
    } else {
        spell(fields.iter().map(|f| f.name.clone()).collect())
    }
}

/// Lines of a doc string, trailing whitespace trimmed
pub fn doc_lines(doc: &str) -> impl Iterator<Item = &str> {
    doc.lines().map(str::trim_end)
}

/// Render `doc` as prefixed comment lines at `indent`
pub fn render_doc(output: &mut String, doc: Option<&str>, indent: &str, prefix: &str) {
    if let Some(doc) = doc {
        for line in doc_lines(doc) {
            if line.is_empty() {
                output.push_str(&format!("{}{}\n", indent, prefix.trim_end()));
            } else {
                output.push_str(&format!("{}{}{}\n", indent, prefix, line));
            }
        }
    }
}

/// Escape a string for a double-quoted literal (Rust, TypeScript, Python)
pub fn quote(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    result.push('"');
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            c => result.push(c),
        }
    }
    result.push('"');
    result
}
