#![deny(missing_docs)]

//! # Generator Trait
//!
//! Defines the interface an annotation handler implements to turn scanned source into
//! generated files.

use crate::error::AppResult;
use crate::parser::{Annotation, ParsedModule, ParsedStruct};
use crate::writer::WriteDirective;

/// Everything a generator sees for one annotation occurrence.
#[derive(Debug, Clone, Copy)]
pub struct GenerationInput<'a> {
    /// The annotation being handled.
    pub annotation: &'a Annotation,
    /// The scanned file the annotation was found in.
    pub module: &'a ParsedModule,
    /// The struct the annotation is attached to. `None` for module-level annotations.
    pub target: Option<&'a ParsedStruct>,
}

impl<'a> GenerationInput<'a> {
    /// Input for an annotation attached to `target`.
    pub fn for_struct(
        annotation: &'a Annotation,
        module: &'a ParsedModule,
        target: &'a ParsedStruct,
    ) -> Self {
        Self {
            annotation,
            module,
            target: Some(target),
        }
    }

    /// Input for a module-level annotation.
    pub fn for_module(annotation: &'a Annotation, module: &'a ParsedModule) -> Self {
        Self {
            annotation,
            module,
            target: None,
        }
    }
}

/// A handler for one annotation name.
///
/// Generators only render; writing, formatting and overwrite checks belong to
/// [`crate::writer::write_directives`]. Every directive path is relative to the
/// output root of the annotated file.
pub trait Generator {
    /// The annotation name this generator answers to, without the `@`.
    fn annotation(&self) -> &'static str;

    /// Renders the files for one annotation occurrence.
    fn generate(&self, input: &GenerationInput<'_>) -> AppResult<Vec<WriteDirective>>;
}
