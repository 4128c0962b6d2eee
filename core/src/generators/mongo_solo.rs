//! # Base Module Generator
//!
//! Handles `//! @mongo`. Emits `mdb/`, the connection plumbing without any record type.

use crate::codegen::{ensure_rendered, render};
use crate::error::AppResult;
use crate::generators::common::{BASE_IMPORTS, CONFIG, CONNECTION, COUNT_AND_EXEC_FUNCS, ERRORS};
use crate::generators::docs;
use crate::generators::traits::{GenerationInput, Generator};
use crate::writer::WriteDirective;

/// Directory of the base module.
pub const SOLO_DIR: &str = "mdb";

/// Generator for the `@mongo` annotation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoSoloGenerator;

impl Generator for MongoSoloGenerator {
    fn annotation(&self) -> &'static str {
        "mongo"
    }

    fn generate(&self, input: &GenerationInput<'_>) -> AppResult<Vec<WriteDirective>> {
        if let Some(target) = input.target {
            tracing::debug!(record = %target.name, "@mongo does not use the struct it is attached to");
        }

        let pairs = [
            ("Module", SOLO_DIR),
            ("BaseImports", BASE_IMPORTS),
            ("Errors", ERRORS),
            ("Config", CONFIG),
            ("Connection", CONNECTION),
            ("CountAndExec", COUNT_AND_EXEC_FUNCS),
        ];

        let module = render(MODULE_TEMPLATE, &pairs);
        ensure_rendered("mod.rs", &module)?;
        let readme = render(&docs::readme(docs::SOLO_README), &pairs);
        ensure_rendered("README.md", &readme)?;

        tracing::debug!(file = %input.module.path.display(), "rendered base module");

        Ok(vec![
            WriteDirective::new(SOLO_DIR, "mod.rs", module),
            WriteDirective::new(SOLO_DIR, "README.md", readme),
        ])
    }
}

const MODULE_TEMPLATE: &str = r##"//! Shared MongoDB connection handling.
//!
//! Generated by mgokit.

{{BaseImports}}{{Errors}}{{Config}}{{Connection}}{{CountAndExec}}"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::validate_rust_source;
    use crate::parser::{parse_module, Annotation};
    use std::path::Path;

    #[test]
    fn test_emits_base_module() {
        let module = parse_module("//! @mongo\n", Path::new("src/lib.rs"), "crate");
        let annotation = Annotation::new("mongo");
        let out = MongoSoloGenerator
            .generate(&GenerationInput::for_module(&annotation, &module))
            .unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].relative_path(), Path::new("mdb/mod.rs"));
        assert_eq!(out[1].relative_path(), Path::new("mdb/README.md"));

        let code = &out[0].contents;
        validate_rust_source("mdb/mod.rs", code).unwrap();
        assert!(code.contains("pub trait MongoDb"));
        assert!(code.contains("pub async fn add_index<M: MongoDb>"));
        assert!(code.contains("pub async fn exec<M, F, Fut>"));
        assert!(!code.contains("FindOptions"));
        assert!(out[1].contents.starts_with("# mdb"));
    }
}
