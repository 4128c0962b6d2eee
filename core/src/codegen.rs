#![deny(missing_docs)]

//! # Code Generation
//!
//! Utilities shared by the generator templates:
//! - placeholder substitution for the template bodies,
//! - syntax validation of rendered Rust,
//! - pretty printing of rendered Rust.

use crate::error::{AppError, AppResult};
use ra_ap_edition::Edition;
use ra_ap_syntax::SourceFile;

/// Replaces every `{{key}}` in `template` with its value.
///
/// Keys missing from `values` are left in place so `ensure_rendered` can report them.
///
/// ```
/// use mgokit_core::codegen::render;
///
/// let out = render("pub struct {{Accessor}};", &[("Accessor", "UserDb")]);
/// assert_eq!(out, "pub struct UserDb;");
/// ```
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in values {
        out = out.replace(&format!("{{{{{}}}}}", key), value);
    }
    out
}

/// Fails if `rendered` still contains an unsubstituted `{{placeholder}}`.
pub fn ensure_rendered(file_name: &str, rendered: &str) -> AppResult<()> {
    if let Some(start) = rendered.find("{{") {
        let tail = &rendered[start..];
        let end = tail.find("}}").map_or(tail.len(), |e| e + 2);
        return Err(AppError::InvalidOutput(
            file_name.to_string(),
            format!("unrendered placeholder {}", &tail[..end]),
        ));
    }
    Ok(())
}

/// Checks that `code` parses as a Rust source file.
///
/// # Examples
/// ```
/// use mgokit_core::codegen::validate_rust_source;
///
/// assert!(validate_rust_source("user_db/mod.rs", "pub fn ok() {}").is_ok());
/// assert!(validate_rust_source("user_db/mod.rs", "pub fn broken( {}").is_err());
/// ```
pub fn validate_rust_source(file_name: &str, code: &str) -> AppResult<()> {
    let parse = SourceFile::parse(code, Edition::Edition2021);

    if !parse.errors().is_empty() {
        let errs: Vec<String> = parse
            .errors()
            .into_iter()
            .take(5)
            .map(|e| e.to_string())
            .collect();
        return Err(AppError::InvalidOutput(
            file_name.to_string(),
            errs.join(", "),
        ));
    }

    Ok(())
}

/// Pretty prints Rust source with `prettyplease`.
///
/// Only doc comments survive formatting, so templates document generated items with
/// `///` and `//!`.
pub fn format_rust_source(file_name: &str, code: &str) -> AppResult<String> {
    let file = syn::parse_file(code)
        .map_err(|e| AppError::InvalidOutput(file_name.to_string(), e.to_string()))?;
    Ok(prettyplease::unparse(&file))
}

/// Renders a string as a Rust raw string literal, picking enough `#`s to fit the content.
///
/// ```
/// use mgokit_core::codegen::raw_string_literal;
///
/// assert_eq!(raw_string_literal("{\"a\": 1}"), "r#\"{\"a\": 1}\"#");
/// ```
pub fn raw_string_literal(content: &str) -> String {
    let mut hashes = 1;
    while content.contains(&format!("\"{}", "#".repeat(hashes))) {
        hashes += 1;
    }
    let fence = "#".repeat(hashes);
    format!("r{fence}\"{content}\"{fence}")
}

/// Renders a string as a regular Rust string literal.
pub fn string_literal(content: &str) -> String {
    format!("{:?}", content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_repeated_keys() {
        let out = render(
            "{{Name}} and {{Name}} with {{Other}}",
            &[("Name", "User"), ("Other", "x")],
        );
        assert_eq!(out, "User and User with x");
    }

    #[test]
    fn test_ensure_rendered_reports_placeholder() {
        let err = ensure_rendered("mod.rs", "fn {{Missing}}() {}").unwrap_err();
        assert!(err.to_string().contains("{{Missing}}"));
        assert!(ensure_rendered("mod.rs", "fn ok() {}").is_ok());
    }

    #[test]
    fn test_validate_reports_file() {
        let err = validate_rust_source("user_db/tests.rs", "fn x() { let = ; }").unwrap_err();
        match err {
            AppError::InvalidOutput(file, _) => assert_eq!(file, "user_db/tests.rs"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_format_keeps_docs() {
        let out = format_rust_source("lib.rs", "/// Doc.\npub   fn a( ) {}").unwrap();
        assert!(out.contains("/// Doc."));
        assert!(out.contains("pub fn a() {}"));
    }

    #[test]
    fn test_raw_string_with_hash_sequence() {
        let lit = raw_string_literal("say \"#hi\"");
        assert_eq!(lit, "r##\"say \"#hi\"\"##");
    }

    #[test]
    fn test_string_literal_escapes() {
        assert_eq!(string_literal("a\"b"), "\"a\\\"b\"");
    }
}
