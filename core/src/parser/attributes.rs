//! # Attribute Operations
//!
//! internal logic for parsing `#[serde(...)]` attributes, which decide the document keys
//! generated accessors read and write.

use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutyKebabCase, ToShoutySnakeCase, ToSnakeCase,
    ToUpperCamelCase,
};
use ra_ap_syntax::ast::{self};
use ra_ap_syntax::{AstNode, SyntaxNode};
use regex::Regex;
use std::sync::OnceLock;

/// Helper struct for attributes extracted from a single node.
#[derive(Default, Debug)]
pub struct AttrInfo {
    /// The rename value if present.
    pub rename: Option<String>,
    /// Whether the skip flag was found.
    pub is_skipped: bool,
    /// The container-level `rename_all` rule if present.
    pub rename_all: Option<String>,
}

/// Analyzes attributes on a node to find `serde` configurations.
pub fn extract_attributes(node: &SyntaxNode) -> AttrInfo {
    let mut info = AttrInfo::default();

    let attributes = node.children().filter_map(ast::Attr::cast);

    for attr in attributes {
        if let Some(meta) = attr.meta() {
            if let Some(path) = meta.path() {
                if path.to_string() == "serde" {
                    if let Some(tt) = meta.token_tree() {
                        parse_attribute_content(&tt.to_string(), &mut info);
                    }
                }
            }
        }
    }

    info
}

/// Parses the inner content of an attribute.
fn parse_attribute_content(content: &str, info: &mut AttrInfo) {
    static RENAME_RE: OnceLock<Regex> = OnceLock::new();
    let rename_re =
        RENAME_RE.get_or_init(|| Regex::new(r#"\brename\s*=\s*"([^"]+)""#).expect("Invalid regex"));

    static SKIP_RE: OnceLock<Regex> = OnceLock::new();
    let skip_re = SKIP_RE.get_or_init(|| Regex::new(r#"\bskip\b"#).expect("Invalid regex"));

    static RENAME_ALL_RE: OnceLock<Regex> = OnceLock::new();
    let rename_all_re = RENAME_ALL_RE
        .get_or_init(|| Regex::new(r#"\brename_all\s*=\s*"([^"]+)""#).expect("Invalid regex"));

    if let Some(caps) = rename_re.captures(content) {
        if let Some(val) = caps.get(1) {
            info.rename = Some(val.as_str().to_string());
        }
    }

    if skip_re.is_match(content) {
        info.is_skipped = true;
    }

    if let Some(caps) = rename_all_re.captures(content) {
        if let Some(val) = caps.get(1) {
            info.rename_all = Some(val.as_str().to_string());
        }
    }
}

/// Applies a serde `rename_all` rule to a field name.
///
/// Unknown rules leave the name untouched, matching what serde would reject at compile time
/// anyway.
pub fn apply_rename_all(rule: &str, name: &str) -> String {
    let name = name.trim_start_matches("r#");
    match rule {
        "lowercase" => name.to_lowercase(),
        "UPPERCASE" => name.to_uppercase(),
        "PascalCase" => name.to_upper_camel_case(),
        "camelCase" => name.to_lower_camel_case(),
        "snake_case" => name.to_snake_case(),
        "SCREAMING_SNAKE_CASE" => name.to_shouty_snake_case(),
        "kebab-case" => name.to_kebab_case(),
        "SCREAMING-KEBAB-CASE" => name.to_shouty_kebab_case(),
        _ => name.to_string(),
    }
}
