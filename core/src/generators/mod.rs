#![deny(missing_docs)]

//! # Generators
//!
//! Pluggable annotation handlers.
//!
//! - **traits**: Defines `Generator` and the input it receives.
//! - **context**: Resolves an annotated struct into template values.
//! - **mongo_api**, **mongo_func**, **mongo_solo**: The built-in handlers.

pub mod common;
pub mod context;
pub mod docs;
pub mod mongo_api;
pub mod mongo_func;
pub mod mongo_solo;
pub mod traits;

pub use context::StructContext;
pub use mongo_api::MongoApiGenerator;
pub use mongo_func::MongoFuncGenerator;
pub use mongo_solo::MongoSoloGenerator;
pub use traits::{GenerationInput, Generator};

use crate::error::AppResult;
use crate::parser::{ParsedModule, ASSOCIATES};
use crate::writer::WriteDirective;
use std::collections::{BTreeMap, HashSet};

/// Maps annotation names to their generators.
pub struct AnnotationRegistry {
    generators: BTreeMap<&'static str, Box<dyn Generator>>,
}

impl Default for AnnotationRegistry {
    /// A registry with `@mongo`, `@mongoapi` and `@mongofunc` registered.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(MongoSoloGenerator);
        registry.register(MongoApiGenerator);
        registry.register(MongoFuncGenerator);
        registry
    }
}

impl AnnotationRegistry {
    /// A registry without generators.
    pub fn empty() -> Self {
        Self {
            generators: BTreeMap::new(),
        }
    }

    /// Registers `generator` under its annotation name, replacing any previous one.
    pub fn register(&mut self, generator: impl Generator + 'static) {
        let name = generator.annotation();
        if self.generators.insert(name, Box::new(generator)).is_some() {
            tracing::debug!(annotation = name, "replaced generator");
        }
    }

    /// The generator for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&dyn Generator> {
        self.generators.get(name).map(|g| g.as_ref())
    }

    /// Registered annotation names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        self.generators.keys().copied().collect()
    }

    /// Runs every registered generator over the annotations of `module`.
    ///
    /// Module annotations run first, then struct annotations in declaration order. When two
    /// occurrences render the same path, the first one wins. `@associates` is consumed by
    /// the parser, other unknown annotations are ignored.
    pub fn run(&self, module: &ParsedModule) -> AppResult<Vec<WriteDirective>> {
        let mut inputs = Vec::new();
        for annotation in &module.annotations {
            inputs.push(GenerationInput::for_module(annotation, module));
        }
        for record in &module.structs {
            for annotation in &record.annotations {
                inputs.push(GenerationInput::for_struct(annotation, module, record));
            }
        }

        let mut seen = HashSet::new();
        let mut directives = Vec::new();

        for input in inputs {
            let name = input.annotation.name.as_str();
            let Some(generator) = self.get(name) else {
                if name != ASSOCIATES {
                    tracing::debug!(annotation = name, file = %module.path.display(), "no generator registered, ignoring");
                }
                continue;
            };

            tracing::info!(
                annotation = name,
                item = input.target.map_or("<module>", |t| t.name.as_str()),
                file = %module.path.display(),
                "generating"
            );

            for directive in generator.generate(&input)? {
                if seen.insert(directive.relative_path()) {
                    directives.push(directive);
                } else {
                    tracing::debug!(path = %directive.relative_path().display(), "already generated, skipping duplicate");
                }
            }
        }

        Ok(directives)
    }
}
