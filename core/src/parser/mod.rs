#![deny(missing_docs)]

//! # Parser Module
//!
//! Handles parsing of Rust source code using the rust-analyzer syntax library.
//! Extracts annotated structs, their fields, serde attributes and inherent methods, and
//! walks source trees to find every annotated file.

pub mod annotations;
pub mod attributes;
pub mod extractors;
pub mod models;
pub mod scanner;

pub use annotations::{parse_marker, CommentScope, ASSOCIATES};
pub use extractors::{extract_struct, parse_module};
pub use models::{Annotation, ParsedField, ParsedModule, ParsedStruct};
pub use scanner::{module_path_for, scan_directory};
