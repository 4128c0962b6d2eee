#![deny(missing_docs)]

//! # mgokit Core
//!
//! Core library for the MongoDB accessor generator: scans Rust sources for annotated
//! structs and renders CRUD packages for them.

/// Shared error types.
pub mod error;

/// AST Parsing logic.
pub mod parser;

/// Type mapping logic (Rust -> JSON).
pub mod type_mapping;

/// Identifier derivation.
pub mod naming;

/// Deterministic fixture values.
pub mod sample;

/// Code generation utilities.
pub mod codegen;

/// Annotation handlers.
pub mod generators;

/// Output writing.
pub mod writer;

/// End to end generation runs.
pub mod pipeline;

pub use error::{AppError, AppResult};
pub use generators::{AnnotationRegistry, GenerationInput, Generator};
pub use parser::{parse_module, scan_directory, Annotation, ParsedModule, ParsedStruct};
pub use pipeline::{generate, render_tree, GenerateOptions};
pub use writer::{
    commit_files, prepare_directives, write_directives, PreparedFile, WriteDirective,
    WriteOptions, WriteReport,
};
