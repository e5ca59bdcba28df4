//! Tuple-Tree Schema Compiler
//!
//! Compiles declarative descriptions of tuple-tree data models (namespaced
//! structs with typed fields, single inheritance, keys and enums) into typed
//! model code for Rust, TypeScript and Python.
//!
//! ## Features
//!
//! - **Strict Validation**: every description error is reported with the
//!   offending element, before any code is generated
//! - **Reference Resolution**: field types, bases and the root type resolve
//!   to definitions in a single arena
//! - **Deterministic Output**: emitting an unchanged schema is byte-identical
//! - **Drift Detection**: generated files carry a checksum manifest
//!
//! ## Pipeline
//!
//! ```text
//! model.yml ──► Schema::load ──► codegen::generate ──► output::write_output
//!                 (register,        (one Emitter          (atomic writes,
//!                  resolve,          per language)          manifest)
//!                  validate)
//! ```

pub mod checksum;
pub mod codegen;
pub mod config;
pub mod error;
pub mod model;
pub mod native;
pub mod output;
pub mod schema;

pub use checksum::Checksum;
pub use codegen::{generate, generate_all, GeneratedFile, GeneratedOutput, Language, RenderProfile};
pub use config::TupleTreeConfig;
pub use error::{Error, Result, SchemaError};
pub use model::{Definition, EnumDefinition, EnumMember, StructDefinition, TypeDefinition};
pub use schema::{Schema, KIND_TAG};
