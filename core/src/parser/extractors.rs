//! # Extraction Logic
//!
//! High-level functions to parse Rust code into IR models.

use crate::error::{AppError, AppResult};
use crate::parser::annotations::{collect_associations, extract_annotations, CommentScope};
use crate::parser::attributes::{apply_rename_all, extract_attributes};
use crate::parser::models::{ParsedField, ParsedModule, ParsedStruct};
use ra_ap_edition::Edition;
use ra_ap_syntax::ast::{self, HasName};
use ra_ap_syntax::{AstNode, SourceFile, SyntaxKind, SyntaxNode};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Parses a single struct by name.
///
/// # Examples
/// ```
/// use mgokit_core::parser::extract_struct;
///
/// let code = r#"
///     // @mongoapi
///     struct User {
///         #[serde(rename = "publicId")]
///         public_id: String,
///         #[serde(skip)]
///         cache: Vec<u8>,
///     }
/// "#;
/// let info = extract_struct(code, "User").unwrap();
/// assert!(info.has_annotation("mongoapi"));
/// assert_eq!(info.fields[0].key(), "publicId");
/// assert!(info.fields[1].is_skipped);
/// ```
pub fn extract_struct(code: &str, struct_name: &str) -> AppResult<ParsedStruct> {
    parse_module(code, Path::new(""), "crate")
        .find_struct(struct_name)
        .cloned()
        .ok_or_else(|| AppError::General(format!("Struct '{}' not found", struct_name)))
}

/// Parses a whole file into a [`ParsedModule`].
///
/// rust-analyzer's parser is error tolerant; a file with syntax errors still yields the
/// structs it could recover.
pub fn parse_module(code: &str, path: &Path, module_path: &str) -> ParsedModule {
    let parse = SourceFile::parse(code, Edition::Edition2021);
    let file = parse.tree();

    if !parse.errors().is_empty() {
        tracing::debug!(
            path = %path.display(),
            errors = parse.errors().len(),
            "source parsed with recoverable errors"
        );
    }

    let methods = collect_inherent_methods(file.syntax());

    let structs = file
        .syntax()
        .descendants()
        .filter_map(ast::Struct::cast)
        .filter_map(|s| parse_struct_node(&s, &methods))
        .collect();

    ParsedModule {
        path: path.to_path_buf(),
        module_path: module_path.to_string(),
        annotations: extract_annotations(file.syntax(), CommentScope::Inner),
        structs,
    }
}

fn parse_struct_node(
    struct_def: &ast::Struct,
    methods: &BTreeMap<String, BTreeSet<String>>,
) -> Option<ParsedStruct> {
    let name = struct_def.name()?.text().to_string();
    let struct_attrs = extract_attributes(struct_def.syntax());
    let annotations = extract_annotations(struct_def.syntax(), CommentScope::Outer);

    let mut fields = Vec::new();

    match struct_def.field_list() {
        Some(ast::FieldList::RecordFieldList(list)) => {
            for field in list.fields() {
                if let (Some(fname), Some(ty)) = (field.name(), field.ty()) {
                    let attrs = extract_attributes(field.syntax());
                    let fname = fname.text().to_string();
                    let rename = attrs.rename.or_else(|| {
                        struct_attrs
                            .rename_all
                            .as_deref()
                            .map(|rule| apply_rename_all(rule, &fname))
                    });

                    fields.push(ParsedField {
                        name: fname,
                        ty: ty.syntax().text().to_string(),
                        rename,
                        is_skipped: attrs.is_skipped,
                    });
                }
            }
        }
        Some(ast::FieldList::TupleFieldList(list)) => {
            for (i, field) in list.fields().enumerate() {
                if let Some(ty) = field.ty() {
                    let attrs = extract_attributes(field.syntax());
                    fields.push(ParsedField {
                        name: i.to_string(),
                        ty: ty.syntax().text().to_string(),
                        rename: attrs.rename,
                        is_skipped: attrs.is_skipped,
                    });
                }
            }
        }
        None => {}
    }

    Some(ParsedStruct {
        associations: collect_associations(&annotations),
        methods: methods.get(&name).cloned().unwrap_or_default(),
        description: extract_doc_comment(struct_def.syntax()),
        name,
        fields,
        annotations,
    })
}

/// Maps struct names to the methods of their inherent (non-trait) impl blocks.
fn collect_inherent_methods(root: &SyntaxNode) -> BTreeMap<String, BTreeSet<String>> {
    let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for imp in root.descendants().filter_map(ast::Impl::cast) {
        if imp.trait_().is_some() {
            continue;
        }
        let Some(self_ty) = imp.self_ty() else {
            continue;
        };
        let ty_text = self_ty.syntax().text().to_string();
        let owner = ty_text
            .split('<')
            .next()
            .unwrap_or_default()
            .rsplit("::")
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        let Some(items) = imp.assoc_item_list() else {
            continue;
        };
        for item in items.assoc_items() {
            if let ast::AssocItem::Fn(func) = item {
                if let Some(fname) = func.name() {
                    map.entry(owner.clone())
                        .or_default()
                        .insert(fname.text().to_string());
                }
            }
        }
    }

    map
}

/// Helper to extract `///` comments from a syntax node's trivia children.
///
/// Marker lines are left out of the description.
fn extract_doc_comment(node: &SyntaxNode) -> Option<String> {
    let mut lines = Vec::new();

    for child in node.children_with_tokens() {
        if child.kind() == SyntaxKind::COMMENT {
            let text = child.to_string();
            if let Some(content) = text.strip_prefix("///") {
                let content = content.strip_prefix(' ').unwrap_or(content);
                if content.trim_start().starts_with('@') {
                    continue;
                }
                lines.push(content.to_string());
            }
        }
    }

    let joined = lines.join("\n").trim().to_string();
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
//! API types.
//! @mongo

use serde::{Deserialize, Serialize};

/// User contains user data.
// @mongoapi
// @associates(@mongoapi, New, NewUser)
// @associates(@mongoapi, Update, UpdateUser)
#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    /// Stable public identifier.
    pub public_id: String,
    pub name: String,
    #[serde(skip)]
    pub session: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub public_id: String,
    pub display_name: String,
}

pub struct UpdateUser {
    pub name: String,
}

pub struct Token(String);

impl User {
    pub fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl<T> crate::api::Wrapper<T> {
    fn inner(&self) {}
}
"#;

    #[test]
    fn test_module_annotations() {
        let module = parse_module(SOURCE, Path::new("src/api.rs"), "crate::api");
        assert_eq!(module.module_path, "crate::api");
        assert_eq!(module.annotations.len(), 1);
        assert_eq!(module.annotations[0].name, "mongo");
        assert!(module.is_annotated());
    }

    #[test]
    fn test_struct_annotations_and_associations() {
        let module = parse_module(SOURCE, Path::new("src/api.rs"), "crate::api");
        let user = module.find_struct("User").unwrap();

        assert!(user.has_annotation("mongoapi"));
        assert_eq!(user.associations.get("New").unwrap(), "NewUser");
        assert_eq!(user.associations.get("Update").unwrap(), "UpdateUser");
        assert_eq!(user.description.as_deref(), Some("User contains user data."));
    }

    #[test]
    fn test_inherent_methods_only() {
        let module = parse_module(SOURCE, Path::new("src/api.rs"), "crate::api");
        let user = module.find_struct("User").unwrap();
        assert!(user.has_method("validate"));
        assert!(!user.has_method("fmt"));
    }

    #[test]
    fn test_generic_qualified_impl_owner() {
        let methods = collect_inherent_methods(
            SourceFile::parse(SOURCE, Edition::Edition2021)
                .tree()
                .syntax(),
        );
        assert!(methods.get("Wrapper").unwrap().contains("inner"));
    }

    #[test]
    fn test_rename_all_applies_to_fields() {
        let module = parse_module(SOURCE, Path::new("src/api.rs"), "crate::api");
        let new_user = module.find_struct("NewUser").unwrap();
        assert_eq!(new_user.fields[0].key(), "publicId");
        assert_eq!(new_user.fields[1].key(), "displayName");
    }

    #[test]
    fn test_skipped_fields_not_stored() {
        let user = extract_struct(SOURCE, "User").unwrap();
        let stored: Vec<_> = user.stored_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(stored, vec!["public_id", "name"]);
        assert!(user.public_id().is_some());
    }

    #[test]
    fn test_tuple_struct() {
        let token = extract_struct(SOURCE, "Token").unwrap();
        assert_eq!(token.fields[0].name, "0");
        assert!(token.public_id().is_none());
    }

    #[test]
    fn test_skipped_public_id_does_not_qualify() {
        let code = "struct Ghost {\n    #[serde(skip)]\n    public_id: String,\n}";
        let ghost = extract_struct(code, "Ghost").unwrap();
        assert!(ghost.field("public_id").is_some());
        assert!(ghost.public_id().is_none());
    }

    #[test]
    fn test_missing_struct() {
        let err = extract_struct(SOURCE, "Missing").unwrap_err();
        assert!(err.to_string().contains("Struct 'Missing' not found"));
    }
}
