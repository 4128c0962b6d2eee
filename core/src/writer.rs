#![deny(missing_docs)]

//! # Writer
//!
//! Write directives produced by generators, and the routine that puts them on disk.

use crate::codegen::{format_rust_source, validate_rust_source};
use crate::error::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

/// One file a generator wants written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteDirective {
    /// Directory relative to the output root, e.g. `user_db`.
    pub dir: PathBuf,
    /// File name inside `dir`.
    pub file_name: String,
    /// Rendered contents.
    pub contents: String,
}

impl WriteDirective {
    /// Creates a directive.
    pub fn new(dir: impl Into<PathBuf>, file_name: impl Into<String>, contents: String) -> Self {
        Self {
            dir: dir.into(),
            file_name: file_name.into(),
            contents,
        }
    }

    /// Path relative to the output root.
    pub fn relative_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Whether the directive holds Rust source.
    pub fn is_rust(&self) -> bool {
        self.file_name.ends_with(".rs")
    }
}

/// Options controlling how directives are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Overwrite files that already exist.
    pub force: bool,
    /// Pretty print Rust files before writing.
    pub format: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            force: false,
            format: true,
        }
    }
}

/// Outcome of a write pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Files created or overwritten.
    pub written: Vec<PathBuf>,
    /// Files left alone because they existed and `force` was off.
    pub skipped: Vec<PathBuf>,
}

/// A directive validated and resolved to its final path and contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedFile {
    /// Absolute output path.
    pub path: PathBuf,
    /// Contents to write, formatted when requested.
    pub contents: String,
}

/// Validates and formats `directives` below `root` without touching the disk.
pub fn prepare_directives(
    root: &Path,
    directives: &[WriteDirective],
    options: WriteOptions,
) -> AppResult<Vec<PreparedFile>> {
    let mut prepared = Vec::with_capacity(directives.len());

    for directive in directives {
        let label = directive.relative_path().display().to_string();
        let contents = if directive.is_rust() {
            validate_rust_source(&label, &directive.contents)?;
            if options.format {
                format_rust_source(&label, &directive.contents)?
            } else {
                directive.contents.clone()
            }
        } else {
            directive.contents.clone()
        };
        prepared.push(PreparedFile {
            path: root.join(directive.relative_path()),
            contents,
        });
    }

    Ok(prepared)
}

/// Puts prepared files on disk, skipping existing ones unless `force` is set.
pub fn commit_files(prepared: Vec<PreparedFile>, options: WriteOptions) -> AppResult<WriteReport> {
    let mut report = WriteReport::default();

    for PreparedFile { path, contents } in prepared {
        if path.exists() && !options.force {
            tracing::info!(path = %path.display(), "file exists, skipping (use --force to regenerate)");
            report.skipped.push(path);
            continue;
        }

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    AppError::General(format!("Failed to create directory {:?}: {}", parent, e))
                })?;
                tracing::debug!(dir = %parent.display(), "created package directory");
            }
        }

        fs::write(&path, contents)
            .map_err(|e| AppError::General(format!("Failed to write file {:?}: {}", path, e)))?;
        tracing::info!(path = %path.display(), "wrote file");
        report.written.push(path);
    }

    Ok(report)
}

/// Writes `directives` below `root`.
///
/// Rust files are validated before anything touches the disk, so one broken template
/// leaves no partial output behind.
pub fn write_directives(
    root: &Path,
    directives: &[WriteDirective],
    options: WriteOptions,
) -> AppResult<WriteReport> {
    let prepared = prepare_directives(root, directives, options)?;
    commit_files(prepared, options)
}
