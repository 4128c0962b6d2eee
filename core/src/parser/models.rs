//! # Data Models
//!
//! Intermediate Representation (IR) of scanned Rust code: the reflected struct metadata
//! that generator templates are rendered against.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// A marker comment such as `// @mongoapi` or `// @associates(@mongoapi, New, NewUser)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// The annotation name without the leading `@`.
    pub name: String,
    /// Comma separated arguments from the optional parenthesised list.
    pub arguments: Vec<String>,
}

impl Annotation {
    /// Creates an annotation without arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }
}

/// Represents a field extracted from a struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedField {
    /// The name of the field.
    pub name: String,
    /// The raw Rust type string.
    pub ty: String,
    /// The name override from `#[serde(rename = "...")]`.
    pub rename: Option<String>,
    /// Whether the field is marked `#[serde(skip)]`.
    pub is_skipped: bool,
}

impl ParsedField {
    /// The document key this field is stored under.
    ///
    /// ```
    /// use mgokit_core::parser::ParsedField;
    ///
    /// let field = ParsedField {
    ///     name: "r#type".into(),
    ///     ty: "String".into(),
    ///     rename: None,
    ///     is_skipped: false,
    /// };
    /// assert_eq!(field.key(), "type");
    /// ```
    pub fn key(&self) -> &str {
        match &self.rename {
            Some(rename) => rename,
            None => self.name.trim_start_matches("r#"),
        }
    }

    /// Whether the field type is a plain `String`.
    pub fn is_string(&self) -> bool {
        matches!(
            self.ty.replace(' ', "").as_str(),
            "String" | "std::string::String" | "alloc::string::String"
        )
    }
}

/// Represents a parsed struct with its field, doc, annotation and method metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedStruct {
    /// The struct name.
    pub name: String,
    /// The struct-level description from doc comments.
    pub description: Option<String>,
    /// The list of fields. Tuple structs use positional names.
    pub fields: Vec<ParsedField>,
    /// Annotations found in the comments attached to the struct.
    pub annotations: Vec<Annotation>,
    /// Alternate shapes keyed by action (`New`, `Update`), from `@associates`.
    pub associations: BTreeMap<String, String>,
    /// Names of inherent methods declared for the struct in the same file.
    pub methods: BTreeSet<String>,
}

impl ParsedStruct {
    /// Looks up a field by its Rust name.
    pub fn field(&self, name: &str) -> Option<&ParsedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the `public_id` field when it is a stored `String`.
    pub fn public_id(&self) -> Option<&ParsedField> {
        self.field("public_id").filter(|f| f.is_string() && !f.is_skipped)
    }

    /// Whether the struct carries an annotation with the given name.
    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.name == name)
    }

    /// Whether an inherent method with the given name exists.
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains(name)
    }

    /// Fields that are persisted (not `#[serde(skip)]`).
    pub fn stored_fields(&self) -> impl Iterator<Item = &ParsedField> {
        self.fields.iter().filter(|f| !f.is_skipped)
    }
}

/// One scanned Rust source file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedModule {
    /// Location of the file on disk.
    pub path: PathBuf,
    /// Rust path of the module, e.g. `crate::api`.
    pub module_path: String,
    /// Module-level annotations from `//!` comments.
    pub annotations: Vec<Annotation>,
    /// Every struct declared in the file.
    pub structs: Vec<ParsedStruct>,
}

impl ParsedModule {
    /// Resolves a struct declared in this module.
    pub fn find_struct(&self, name: &str) -> Option<&ParsedStruct> {
        self.structs.iter().find(|s| s.name == name)
    }

    /// Whether the module or any of its structs carries an annotation.
    pub fn is_annotated(&self) -> bool {
        !self.annotations.is_empty() || self.structs.iter().any(|s| !s.annotations.is_empty())
    }

    /// The qualified path of a struct in this module, e.g. `crate::api::User`.
    pub fn qualified(&self, name: &str) -> String {
        format!("{}::{}", self.module_path, name)
    }
}
