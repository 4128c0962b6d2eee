//! # Source Tree Scanner
//!
//! Walks a directory, parses every Rust file and keeps the ones carrying annotations.

use crate::error::{AppError, AppResult};
use crate::parser::extractors::parse_module;
use crate::parser::models::ParsedModule;
use std::fs;
use std::path::{Component, Path};
use walkdir::{DirEntry, WalkDir};

/// Scans `root` recursively for annotated Rust files.
///
/// `target/` and hidden directories are skipped. Results are sorted by path so generation
/// order is stable across runs.
pub fn scan_directory(root: &Path) -> AppResult<Vec<ParsedModule>> {
    if !root.exists() {
        return Err(AppError::General(format!(
            "Target directory not found: {:?}",
            root
        )));
    }

    let mut modules = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored_dir(e));

    for entry in walker {
        let entry = entry.map_err(|e| AppError::General(format!("Failed to walk {:?}: {}", root, e)))?;
        let path = entry.path();

        if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "rs") {
            continue;
        }

        let code = fs::read_to_string(path)
            .map_err(|e| AppError::Parse(format!("{}: {}", path.display(), e)))?;

        let module_path = module_path_for(root, path);
        let module = parse_module(&code, path, &module_path);

        if module.is_annotated() {
            tracing::debug!(
                path = %path.display(),
                module = %module.module_path,
                structs = module.structs.len(),
                "found annotated module"
            );
            modules.push(module);
        } else {
            tracing::trace!(path = %path.display(), "no annotations");
        }
    }

    Ok(modules)
}

fn is_ignored_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name == "target" || name.starts_with('.')
}

/// Computes the Rust module path of a file.
///
/// The path is taken relative to the closest `src` directory above the file, or to `root`
/// when there is none.
///
/// ```
/// use mgokit_core::parser::module_path_for;
/// use std::path::Path;
///
/// let root = Path::new("project");
/// assert_eq!(module_path_for(root, Path::new("project/src/lib.rs")), "crate");
/// assert_eq!(module_path_for(root, Path::new("project/src/api/mod.rs")), "crate::api");
/// assert_eq!(module_path_for(root, Path::new("project/src/api/user.rs")), "crate::api::user");
/// ```
pub fn module_path_for(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let components: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let start = components
        .iter()
        .rposition(|c| c == "src")
        .map_or(0, |idx| idx + 1);

    let mut segments: Vec<String> = components[start..].to_vec();

    if let Some(last) = segments.pop() {
        let stem = last.strip_suffix(".rs").unwrap_or(&last).to_string();
        if !matches!(stem.as_str(), "lib" | "main" | "mod") {
            segments.push(stem);
        }
    }

    std::iter::once("crate".to_string())
        .chain(segments.into_iter().map(|s| s.replace('-', "_")))
        .collect::<Vec<_>>()
        .join("::")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_module_path_without_src() {
        let root = Path::new("/work/tree");
        assert_eq!(
            module_path_for(root, Path::new("/work/tree/models/user.rs")),
            "crate::models::user"
        );
        assert_eq!(module_path_for(root, Path::new("/work/tree/main.rs")), "crate");
    }

    #[test]
    fn test_module_path_nested_src_wins() {
        let root = Path::new("/ws");
        assert_eq!(
            module_path_for(root, Path::new("/ws/crates/api-types/src/user-types.rs")),
            "crate::user_types"
        );
    }

    #[test]
    fn test_scan_keeps_annotated_files() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("api")).unwrap();
        fs::create_dir_all(dir.path().join("target/debug")).unwrap();

        fs::write(
            src.join("api/mod.rs"),
            "// @mongoapi\npub struct User { pub public_id: String }\n",
        )
        .unwrap();
        fs::write(src.join("lib.rs"), "pub mod api;\npub struct Plain;\n").unwrap();
        fs::write(src.join("notes.txt"), "// @mongoapi").unwrap();
        fs::write(
            dir.path().join("target/debug/out.rs"),
            "// @mongoapi\npub struct Built { pub public_id: String }\n",
        )
        .unwrap();

        let modules = scan_directory(dir.path()).unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].module_path, "crate::api");
        assert_eq!(modules[0].structs[0].name, "User");
    }

    #[test]
    fn test_scan_missing_root() {
        let dir = tempdir().unwrap();
        let err = scan_directory(&dir.path().join("nope")).unwrap_err();
        assert!(err.to_string().contains("Target directory not found"));
    }
}
