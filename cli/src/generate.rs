#![deny(missing_docs)]

//! # Generate Command
//!
//! Scans a source tree for annotated structs and writes the MongoDB packages next to them.

use std::path::{Path, PathBuf};

use mgokit_core::{generate, AnnotationRegistry, GenerateOptions, WriteOptions, WriteReport};

use crate::error::{CliError, CliResult};

/// Arguments for the generate command.
#[derive(clap::Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Output directory, relative to the directory of each annotated file.
    #[clap(long, env = "MGOKIT_DEST", default_value = "./", value_parser = relative_path)]
    pub dest: PathBuf,

    /// Directory to scan, relative to the working directory.
    #[clap(long, env = "MGOKIT_TARGET", default_value = "./", value_parser = relative_path)]
    pub target: PathBuf,

    /// Overwrite files that already exist.
    #[clap(long)]
    pub force: bool,

    /// Write generated Rust as rendered, without pretty printing.
    #[clap(long)]
    pub no_format: bool,
}

/// Accepts only relative paths.
fn relative_path(raw: &str) -> CliResult<PathBuf> {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        return Err(CliError::InvalidPath(raw.to_string()));
    }
    Ok(path)
}

/// Executes the generate command.
///
/// # Arguments
///
/// * `args` - Command arguments.
/// * `cwd` - Directory the relative `target` is resolved against.
/// * `registry` - The annotation handlers to run.
pub fn execute(
    args: &GenerateArgs,
    cwd: &Path,
    registry: &AnnotationRegistry,
) -> CliResult<WriteReport> {
    let target = cwd.join(&args.target);
    if !target.is_dir() {
        return Err(CliError::General(format!(
            "Target directory not found: {:?}",
            target
        )));
    }

    let options = GenerateOptions {
        dest: args.dest.clone(),
        write: WriteOptions {
            force: args.force,
            format: !args.no_format,
        },
    };

    tracing::debug!(root = %target.display(), dest = %args.dest.display(), force = args.force, "starting generation");
    let report = generate(&target, registry, &options)?;

    for path in &report.written {
        println!("- Created file: {}", display_relative(cwd, path));
    }
    for path in &report.skipped {
        println!("- Skipped existing file: {}", display_relative(cwd, path));
    }
    if report.written.is_empty() && report.skipped.is_empty() {
        println!("No annotated structs found under {}", display_relative(cwd, &target));
    }

    Ok(report)
}

fn display_relative(cwd: &Path, path: &Path) -> String {
    path.strip_prefix(cwd).unwrap_or(path).display().to_string()
}
