//! # Pipeline
//!
//! Scan, render and write: the whole `generate` run over one source tree.

use crate::error::AppResult;
use crate::generators::AnnotationRegistry;
use crate::parser::scan_directory;
use crate::writer::{commit_files, prepare_directives, WriteDirective, WriteOptions, WriteReport};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Options of a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Output directory, relative to each annotated file's directory.
    pub dest: PathBuf,
    /// How files are written.
    pub write: WriteOptions,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            dest: PathBuf::from("./"),
            write: WriteOptions::default(),
        }
    }
}

/// Rendered output of one annotated file.
#[derive(Debug, Clone)]
pub struct RenderedModule {
    /// Directory the directives are written below.
    pub root: PathBuf,
    /// Files to write.
    pub directives: Vec<WriteDirective>,
}

/// Scans `target` and renders every annotation without touching the disk.
///
/// Fails on the first generator error.
pub fn render_tree(
    target: &Path,
    registry: &AnnotationRegistry,
    dest: &Path,
) -> AppResult<Vec<RenderedModule>> {
    let modules = scan_directory(target)?;
    tracing::info!(root = %target.display(), modules = modules.len(), "scanned source tree");

    let mut rendered = Vec::new();
    for module in &modules {
        let directives = registry.run(module)?;
        if directives.is_empty() {
            continue;
        }
        let base = module.path.parent().unwrap_or(target);
        rendered.push(RenderedModule {
            root: output_root(base, dest),
            directives,
        });
    }
    Ok(rendered)
}

/// Joins `dest` onto `base` without `.` components, so `src` and `./` give `src`.
fn output_root(base: &Path, dest: &Path) -> PathBuf {
    base.join(dest)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Generates the packages for every annotation found below `target`.
///
/// Everything is rendered and checked before the first file is written, so an error in
/// one struct leaves the tree untouched.
pub fn generate(
    target: &Path,
    registry: &AnnotationRegistry,
    options: &GenerateOptions,
) -> AppResult<WriteReport> {
    let rendered = render_tree(target, registry, &options.dest)?;

    let mut prepared = Vec::new();
    let mut seen = HashSet::new();
    for module in &rendered {
        for file in prepare_directives(&module.root, &module.directives, options.write)? {
            if seen.insert(file.path.clone()) {
                prepared.push(file);
            } else {
                tracing::debug!(
                    path = %file.path.display(),
                    "already rendered by another file, dropping"
                );
            }
        }
    }
    let report = commit_files(prepared, options.write)?;

    tracing::info!(
        written = report.written.len(),
        skipped = report.skipped.len(),
        "generation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_output_is_relative_to_annotated_file() {
        let dir = tempdir().unwrap();
        let api = dir.path().join("src/api");
        fs::create_dir_all(&api).unwrap();
        fs::write(
            api.join("mod.rs"),
            "// @mongoapi\npub struct User { pub public_id: String }\n",
        )
        .unwrap();

        let options = GenerateOptions {
            dest: PathBuf::from("gen"),
            ..GenerateOptions::default()
        };
        let report = generate(dir.path(), &AnnotationRegistry::default(), &options).unwrap();

        assert_eq!(report.written.len(), 6);
        assert!(api.join("gen/user_db/mod.rs").exists());
        assert!(api.join("gen/user_db/Dockerfile").exists());
    }

    #[test]
    fn test_error_leaves_tree_untouched() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(
            src.join("a.rs"),
            "// @mongoapi\npub struct Good { pub public_id: String }\n",
        )
        .unwrap();
        fs::write(src.join("b.rs"), "// @mongoapi\npub struct Bad { pub id: u32 }\n").unwrap();

        let err = generate(
            dir.path(),
            &AnnotationRegistry::default(),
            &GenerateOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::MissingPublicId(_)));
        assert!(!src.join("good_db").exists());
    }

    #[test]
    fn test_default_dest_has_no_dot_components() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(
            src.join("lib.rs"),
            "// @mongofunc\npub struct Event { pub public_id: String }\n",
        )
        .unwrap();

        let rendered =
            render_tree(dir.path(), &AnnotationRegistry::default(), Path::new("./")).unwrap();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].root, src);

        let report = generate(
            dir.path(),
            &AnnotationRegistry::default(),
            &GenerateOptions::default(),
        )
        .unwrap();
        assert!(report.written.contains(&src.join("event_mgo/mod.rs")));
        assert!(report
            .written
            .iter()
            .all(|p| !p.components().any(|c| c == Component::CurDir)));
    }

    #[test]
    fn test_output_root_strips_dots() {
        assert_eq!(output_root(Path::new("src"), Path::new("./")), PathBuf::from("src"));
        assert_eq!(
            output_root(Path::new("src"), Path::new("./gen/./db")),
            PathBuf::from("src/gen/db")
        );
        assert_eq!(output_root(Path::new("src"), Path::new("../gen")), PathBuf::from("src/../gen"));
    }

    #[test]
    fn test_shared_output_written_once() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.rs"), "//! @mongo\n\npub struct A;\n").unwrap();
        fs::write(src.join("b.rs"), "//! @mongo\n\npub struct B;\n").unwrap();

        let report = generate(
            dir.path(),
            &AnnotationRegistry::default(),
            &GenerateOptions::default(),
        )
        .unwrap();

        assert_eq!(
            report.written.iter().filter(|p| p.ends_with("mdb/mod.rs")).count(),
            1
        );
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_missing_target() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(render_tree(&missing, &AnnotationRegistry::default(), Path::new("./")).is_err());
    }
}
