//! # Struct Context
//!
//! Resolves what the struct generators need from one annotated struct: the record, the
//! shapes used for create and update, the public id key and the derived names.

use crate::codegen::{raw_string_literal, string_literal};
use crate::error::{AppError, AppResult};
use crate::generators::traits::GenerationInput;
use crate::naming::AccessorNames;
use crate::parser::{ParsedField, ParsedModule, ParsedStruct};
use crate::sample::sample_document;
use heck::ToSnakeCase;

/// Association key of the create shape.
pub const CREATE_ACTION: &str = "New";
/// Association key of the update shape.
pub const UPDATE_ACTION: &str = "Update";

/// One annotated struct, ready to render.
#[derive(Debug, Clone)]
pub struct StructContext<'a> {
    /// The file the struct lives in.
    pub module: &'a ParsedModule,
    /// The annotated struct.
    pub record: &'a ParsedStruct,
    /// Shape accepted by create. The record itself unless associated.
    pub create: &'a ParsedStruct,
    /// Shape accepted by update. The record itself unless associated.
    pub update: &'a ParsedStruct,
    /// The record's `public_id` field.
    pub public_id: &'a ParsedField,
    /// Derived identifiers.
    pub names: AccessorNames,
}

impl<'a> StructContext<'a> {
    /// Resolves the context for a struct-level annotation.
    ///
    /// Fails when the annotation is not attached to a struct or when the struct has no
    /// `public_id: String` field.
    pub fn resolve(input: &GenerationInput<'a>) -> AppResult<Self> {
        let record = input.target.ok_or_else(|| {
            AppError::General(format!(
                "@{} in {} must be attached to a struct",
                input.annotation.name,
                input.module.path.display()
            ))
        })?;

        let public_id = record
            .public_id()
            .ok_or_else(|| AppError::MissingPublicId(record.name.clone()))?;

        Ok(Self {
            module: input.module,
            record,
            create: associated_shape(input.module, record, CREATE_ACTION),
            update: associated_shape(input.module, record, UPDATE_ACTION),
            public_id,
            names: AccessorNames::for_struct(&record.name),
        })
    }

    /// The record, create and update shapes without duplicates, in that order.
    pub fn shapes(&self) -> Vec<&'a ParsedStruct> {
        let mut shapes: Vec<&'a ParsedStruct> = Vec::with_capacity(3);
        for shape in [self.record, self.create, self.update] {
            if !shapes.iter().any(|s| s.name == shape.name) {
                shapes.push(shape);
            }
        }
        shapes
    }

    /// Shapes written to the database, i.e. create and update without duplicates.
    pub fn written_shapes(&self) -> Vec<&'a ParsedStruct> {
        if self.create.name == self.update.name {
            vec![self.create]
        } else {
            vec![self.create, self.update]
        }
    }

    /// `use` line importing every shape from the struct's module.
    pub fn imports(&self) -> String {
        let names: Vec<&str> = self.shapes().iter().map(|s| s.name.as_str()).collect();
        format!("use {}::{{{}}};", self.module.module_path, names.join(", "))
    }

    /// The public id document key as a string literal.
    pub fn public_id_key(&self) -> String {
        string_literal(self.public_id.key())
    }

    /// Name of the function mapping `shape` onto a document.
    pub fn document_fn(shape: &ParsedStruct) -> String {
        format!("{}_document", shape.name.to_snake_case())
    }

    /// Functions mapping the written shapes onto documents, one `to_bson` per stored field.
    pub fn document_builders(&self) -> String {
        let mut out = String::new();
        for shape in self.written_shapes() {
            out.push_str(&format!(
                "\n/// Maps a [`{name}`] onto the stored document.\nfn {func}(elem: &{name}) -> Result<Document, Error> {{\n    let mut document = Document::new();\n",
                name = shape.name,
                func = Self::document_fn(shape),
            ));
            for field in shape.stored_fields() {
                out.push_str(&format!(
                    "    document.insert({}, to_bson(&elem.{})?);\n",
                    string_literal(field.key()),
                    field.name
                ));
            }
            out.push_str("    Ok(document)\n}\n");
        }
        out
    }

    /// Validation guard for `shape`, empty unless the shape has an inherent `validate`.
    ///
    /// `collection` is the tracing field value naming the collection, e.g. `%self.col`.
    pub fn validation(shape: &ParsedStruct, collection: &str) -> String {
        if !shape.has_method("validate") {
            return String::new();
        }
        format!(
            "    if let Err(err) = elem.validate() {{\n        tracing::error!(collection = {collection}, error = %err, \"Failed to validate record\");\n        return Err(Error::Validation(err.to_string()));\n    }}\n"
        )
    }

    /// Contents of `fixtures.rs`: one JSON constant and one loader per shape.
    pub fn fixtures_file(&self) -> AppResult<String> {
        let mut out = format!(
            "//! JSON fixtures for the generated `{}` tests.\n#![allow(dead_code)]\n\n{}\n",
            self.record.name,
            self.imports()
        );

        for shape in self.shapes() {
            let json = serde_json::to_string_pretty(&sample_document(&self.record.name, shape))
                .map_err(|e| AppError::General(format!("Failed to render fixture: {}", e)))?;
            out.push_str(&format!(
                "\n/// Sample `{name}` document.\npub const {constant}: &str = {json};\n\n/// Decodes a [`{name}`] from JSON.\npub fn {loader}(content: &str) -> Result<{name}, serde_json::Error> {{\n    serde_json::from_str(content)\n}}\n",
                name = shape.name,
                constant = AccessorNames::fixture_const(&shape.name),
                json = raw_string_literal(&json),
                loader = AccessorNames::fixture_loader(&shape.name),
            ));
        }

        Ok(out)
    }

    /// The record's doc comment as `//!` lines, led by a blank `//!` line. Empty when
    /// the record is undocumented.
    pub fn record_doc(&self) -> String {
        let Some(text) = &self.record.description else {
            return String::new();
        };
        let mut out = String::from("//!\n");
        for line in text.lines() {
            out.push_str(format!("//! {}", line).trim_end());
            out.push('\n');
        }
        out
    }

    /// The record's doc comment as a README paragraph.
    pub fn record_summary(&self) -> String {
        self.record
            .description
            .as_ref()
            .map(|text| format!("{}\n\n", text))
            .unwrap_or_default()
    }

    /// Template values shared by the struct generators.
    pub fn values(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Record", self.record.name.clone()),
            ("RecordPath", self.module.qualified(&self.record.name)),
            ("RecordDoc", self.record_doc()),
            ("RecordSummary", self.record_summary()),
            ("ModulePath", self.module.module_path.clone()),
            ("Snake", self.names.snake.clone()),
            ("Accessor", self.names.accessor.clone()),
            ("Backend", self.names.backend.clone()),
            ("CreateType", self.create.name.clone()),
            ("UpdateType", self.update.name.clone()),
            ("CreateDocument", Self::document_fn(self.create)),
            ("UpdateDocument", Self::document_fn(self.update)),
            ("PublicIdKey", self.public_id_key()),
            ("PublicIdField", self.public_id.name.clone()),
            ("TestCollection", self.names.test_collection.clone()),
            ("RecordConst", AccessorNames::fixture_const(&self.record.name)),
            ("RecordLoader", AccessorNames::fixture_loader(&self.record.name)),
            ("CreateConst", AccessorNames::fixture_const(&self.create.name)),
            ("CreateLoader", AccessorNames::fixture_loader(&self.create.name)),
            ("UpdateConst", AccessorNames::fixture_const(&self.update.name)),
            ("UpdateLoader", AccessorNames::fixture_loader(&self.update.name)),
            ("Imports", self.imports()),
            ("DocumentBuilders", self.document_builders()),
        ]
    }
}

/// Resolves the shape associated under `action`, falling back to the record.
fn associated_shape<'a>(
    module: &'a ParsedModule,
    record: &'a ParsedStruct,
    action: &str,
) -> &'a ParsedStruct {
    let Some(name) = record.associations.get(action) else {
        return record;
    };
    match module.find_struct(name) {
        Some(shape) => shape,
        None => {
            tracing::warn!(
                record = %record.name,
                action,
                shape = %name,
                "associated struct not found in the same file, using the record"
            );
            record
        }
    }
}

/// Borrows owned template values as the pairs [`crate::codegen::render`] takes.
pub fn as_pairs<'v>(values: &'v [(&'static str, String)]) -> Vec<(&'static str, &'v str)> {
    values.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_module, Annotation};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    const SOURCE: &str = r#"
/// Someone who can sign in.
///
/// Stored once per account.
// @mongoapi
// @associates(@mongoapi, New, NewUser)
// @associates(@mongoapi, Update, UpdateUser)
pub struct User {
    pub public_id: String,
    pub name: String,
    #[serde(rename = "mail")]
    pub email: String,
}

pub struct NewUser {
    pub public_id: String,
    pub name: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), String> { Ok(()) }
}

pub struct UpdateUser {
    pub name: String,
    #[serde(skip)]
    pub touched: bool,
}
"#;

    fn module() -> ParsedModule {
        parse_module(SOURCE, Path::new("src/api.rs"), "crate::api")
    }

    #[test]
    fn test_resolves_associations() {
        let module = module();
        let annotation = Annotation::new("mongoapi");
        let record = module.find_struct("User").unwrap();
        let input = GenerationInput::for_struct(&annotation, &module, record);
        let ctx = StructContext::resolve(&input).unwrap();

        assert_eq!(ctx.create.name, "NewUser");
        assert_eq!(ctx.update.name, "UpdateUser");
        assert_eq!(ctx.public_id_key(), "\"public_id\"");
        assert_eq!(ctx.imports(), "use crate::api::{User, NewUser, UpdateUser};");
        assert!(!StructContext::validation(ctx.create, "%self.col").is_empty());
        assert!(StructContext::validation(ctx.update, "%self.col").is_empty());
    }

    #[test]
    fn test_record_description_rendered() {
        let module = module();
        let annotation = Annotation::new("mongoapi");
        let record = module.find_struct("User").unwrap();
        let ctx = StructContext::resolve(&GenerationInput::for_struct(&annotation, &module, record))
            .unwrap();

        assert_eq!(
            ctx.record_doc(),
            "//!\n//! Someone who can sign in.\n//!\n//! Stored once per account.\n"
        );
        assert_eq!(
            ctx.record_summary(),
            "Someone who can sign in.\n\nStored once per account.\n\n"
        );

        let new_user = module.find_struct("NewUser").unwrap();
        let plain = StructContext::resolve(&GenerationInput::for_struct(&annotation, &module, new_user))
            .unwrap();
        assert!(plain.record_doc().is_empty());
        assert!(plain.record_summary().is_empty());
    }

    #[test]
    fn test_skipped_public_id_is_missing() {
        let module = parse_module(
            "// @mongoapi\nstruct Ghost {\n    #[serde(skip)]\n    public_id: String,\n}",
            Path::new("src/lib.rs"),
            "crate",
        );
        let annotation = Annotation::new("mongoapi");
        let record = module.find_struct("Ghost").unwrap();
        let err = StructContext::resolve(&GenerationInput::for_struct(&annotation, &module, record))
            .unwrap_err();
        assert!(matches!(err, AppError::MissingPublicId(name) if name == "Ghost"));
    }

    #[test]
    fn test_document_builders_skip_and_rename() {
        let module = module();
        let annotation = Annotation::new("mongoapi");
        let record = module.find_struct("User").unwrap();
        let ctx = StructContext::resolve(&GenerationInput::for_struct(&annotation, &module, record))
            .unwrap();
        let builders = ctx.document_builders();

        assert!(builders.contains("fn new_user_document(elem: &NewUser)"));
        assert!(builders.contains("fn update_user_document(elem: &UpdateUser)"));
        assert!(builders.contains("document.insert(\"name\", to_bson(&elem.name)?);"));
        assert!(!builders.contains("touched"));
    }

    #[test]
    fn test_missing_public_id() {
        let module = parse_module(
            "// @mongoapi\nstruct Note { public_id: u64 }",
            Path::new("src/lib.rs"),
            "crate",
        );
        let annotation = Annotation::new("mongoapi");
        let record = module.find_struct("Note").unwrap();
        let err = StructContext::resolve(&GenerationInput::for_struct(&annotation, &module, record))
            .unwrap_err();
        assert!(matches!(err, AppError::MissingPublicId(name) if name == "Note"));
    }

    #[test]
    fn test_module_level_annotation_is_rejected() {
        let module = module();
        let annotation = Annotation::new("mongoapi");
        let err = StructContext::resolve(&GenerationInput::for_module(&annotation, &module))
            .unwrap_err();
        assert!(err.to_string().contains("must be attached to a struct"));
    }

    #[test]
    fn test_unknown_association_falls_back() {
        let module = parse_module(
            "// @mongoapi\n// @associates(@mongoapi, New, Missing)\nstruct User { public_id: String }",
            Path::new("src/lib.rs"),
            "crate",
        );
        let annotation = Annotation::new("mongoapi");
        let record = module.find_struct("User").unwrap();
        let ctx = StructContext::resolve(&GenerationInput::for_struct(&annotation, &module, record))
            .unwrap();
        assert_eq!(ctx.create.name, "User");
        assert_eq!(ctx.shapes().len(), 1);
        assert_eq!(ctx.written_shapes().len(), 1);
    }

    #[test]
    fn test_fixtures_file_lists_every_shape() {
        let module = module();
        let annotation = Annotation::new("mongoapi");
        let record = module.find_struct("User").unwrap();
        let ctx = StructContext::resolve(&GenerationInput::for_struct(&annotation, &module, record))
            .unwrap();
        let fixtures = ctx.fixtures_file().unwrap();

        assert!(fixtures.contains("pub const USER_JSON: &str = r#\""));
        assert!(fixtures.contains("pub fn load_new_user_json(content: &str)"));
        assert!(fixtures.contains("pub const UPDATE_USER_JSON"));
        assert!(fixtures.contains("\"mail\""));
        crate::codegen::validate_rust_source("fixtures.rs", &fixtures).unwrap();
    }
}
