//! # Annotation Markers
//!
//! Reads `@name` / `@name(args)` markers out of line comments. A marker must be the only
//! content of its comment line:
//!
//! ```text
//! // User contains user data.
//! // @mongoapi
//! // @associates(@mongoapi, New, NewUser)
//! ```

use crate::parser::models::Annotation;
use ra_ap_syntax::{SyntaxKind, SyntaxNode};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Annotation used to attach alternate struct shapes to a generator.
pub const ASSOCIATES: &str = "associates";

/// Where a comment sits relative to the item it documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentScope {
    /// `//` and `///` comments attached in front of an item.
    Outer,
    /// `//!` comments describing the enclosing module.
    Inner,
}

/// Parses one comment token into an annotation, if it is a marker line.
///
/// ```
/// use mgokit_core::parser::annotations::{parse_marker, CommentScope};
///
/// let (scope, ann) = parse_marker("// @associates(@mongoapi, New, NewUser)").unwrap();
/// assert_eq!(scope, CommentScope::Outer);
/// assert_eq!(ann.name, "associates");
/// assert_eq!(ann.arguments, vec!["@mongoapi", "New", "NewUser"]);
/// ```
pub fn parse_marker(comment: &str) -> Option<(CommentScope, Annotation)> {
    static MARKER_RE: OnceLock<Regex> = OnceLock::new();
    let marker_re = MARKER_RE.get_or_init(|| {
        Regex::new(r"^@([A-Za-z_][A-Za-z0-9_\-]*)\s*(?:\((.*)\))?\s*$").expect("Invalid regex")
    });

    let (scope, body) = if let Some(rest) = comment.strip_prefix("//!") {
        (CommentScope::Inner, rest)
    } else if let Some(rest) = comment.strip_prefix("///") {
        (CommentScope::Outer, rest)
    } else if let Some(rest) = comment.strip_prefix("//") {
        (CommentScope::Outer, rest)
    } else {
        return None;
    };

    let caps = marker_re.captures(body.trim())?;
    let name = caps.get(1)?.as_str().to_string();
    let arguments = caps
        .get(2)
        .map(|args| {
            args.as_str()
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some((scope, Annotation { name, arguments }))
}

/// Collects annotations from comment tokens.
///
/// Outer markers must be attached to `node` itself. Inner markers are searched in the
/// whole subtree, since the parser may attach a leading `//!` block to the first item.
pub fn extract_annotations(node: &SyntaxNode, scope: CommentScope) -> Vec<Annotation> {
    let comments: Vec<String> = match scope {
        CommentScope::Outer => node
            .children_with_tokens()
            .filter(|child| child.kind() == SyntaxKind::COMMENT)
            .map(|child| child.to_string())
            .collect(),
        CommentScope::Inner => node
            .descendants_with_tokens()
            .filter(|child| child.kind() == SyntaxKind::COMMENT)
            .map(|child| child.to_string())
            .collect(),
    };

    comments
        .iter()
        .filter_map(|comment| parse_marker(comment))
        .filter(|(found, _)| *found == scope)
        .map(|(_, annotation)| annotation)
        .collect()
}

/// Builds the association table from `@associates(@generator, Action, Type)` markers.
///
/// Markers with fewer than three arguments are ignored. The generator argument is kept
/// for readability of the source but does not filter: every generator sees the same
/// shapes.
pub fn collect_associations(annotations: &[Annotation]) -> BTreeMap<String, String> {
    annotations
        .iter()
        .filter(|a| a.name == ASSOCIATES && a.arguments.len() >= 3)
        .map(|a| (a.arguments[1].clone(), a.arguments[2].clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ra_ap_edition::Edition;
    use ra_ap_syntax::{ast, AstNode, SourceFile};

    #[test]
    fn test_plain_marker() {
        let (scope, ann) = parse_marker("//   @mongoapi  ").unwrap();
        assert_eq!(scope, CommentScope::Outer);
        assert_eq!(ann, Annotation::new("mongoapi"));
    }

    #[test]
    fn test_inner_marker() {
        let (scope, ann) = parse_marker("//! @mongo").unwrap();
        assert_eq!(scope, CommentScope::Inner);
        assert_eq!(ann.name, "mongo");
    }

    #[test]
    fn test_prose_is_not_a_marker() {
        assert!(parse_marker("// User contains user data.").is_none());
        assert!(parse_marker("// send mail to @admin please").is_none());
        assert!(parse_marker("/* @mongoapi */").is_none());
    }

    #[test]
    fn test_empty_argument_list() {
        let (_, ann) = parse_marker("/// @mongofunc()").unwrap();
        assert_eq!(ann.name, "mongofunc");
        assert!(ann.arguments.is_empty());
    }

    #[test]
    fn test_extract_from_struct() {
        let code = r#"
// User contains user data.
// @mongoapi
/// @associates(@mongoapi, New, NewUser)
#[derive(Debug)]
pub struct User {
    pub public_id: String,
}
"#;
        let file = SourceFile::parse(code, Edition::Edition2021).tree();
        let s = file
            .syntax()
            .descendants()
            .find_map(ast::Struct::cast)
            .unwrap();

        let anns = extract_annotations(s.syntax(), CommentScope::Outer);
        let names: Vec<_> = anns.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["mongoapi", "associates"]);

        let assoc = collect_associations(&anns);
        assert_eq!(assoc.get("New").map(String::as_str), Some("NewUser"));
    }

    #[test]
    fn test_inner_markers_found_without_blank_line() {
        let code = "//! @mongo\npub struct Event { pub public_id: String }\n";
        let file = SourceFile::parse(code, Edition::Edition2021).tree();

        let anns = extract_annotations(file.syntax(), CommentScope::Inner);
        assert_eq!(anns, vec![Annotation::new("mongo")]);
    }

    #[test]
    fn test_short_associates_ignored() {
        let anns = vec![Annotation {
            name: ASSOCIATES.into(),
            arguments: vec!["@mongoapi".into(), "New".into()],
        }];
        assert!(collect_associations(&anns).is_empty());
    }
}
