#![deny(missing_docs)]

//! # mgokit CLI
//!
//! Command Line Interface for the MongoDB accessor generator.
//!
//! Supported Commands:
//! - `generate`: Scans annotated structs and writes their MongoDB packages.

use clap::{Parser, Subcommand};
use mgokit_core::AnnotationRegistry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::CliResult;

mod error;
mod generate;

#[derive(Parser, Debug)]
#[clap(author, version, about = "MongoDB CRUD accessor generator")]
struct Cli {
    /// Log every scanned file and rendered template.
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate MongoDB packages for annotated structs.
    Generate(generate::GenerateArgs),
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "mgokit=debug" } else { "mgokit=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Generate(args) => {
            let cwd = std::env::current_dir()?;
            let registry = AnnotationRegistry::default();
            generate::execute(args, &cwd, &registry)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli_structure() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate_flags() {
        let cli = Cli::try_parse_from([
            "mgokit", "generate", "--dest", "gen", "--target", "src", "--force", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Commands::Generate(args) = cli.command;
        assert_eq!(args.dest, std::path::PathBuf::from("gen"));
        assert_eq!(args.target, std::path::PathBuf::from("src"));
        assert!(args.force);
        assert!(!args.no_format);
    }

    #[test]
    fn test_absolute_target_rejected() {
        let result = Cli::try_parse_from(["mgokit", "generate", "--target", "/usr/src"]);
        assert!(result.is_err());
    }
}
