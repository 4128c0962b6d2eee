#![deny(missing_docs)]

//! # CLI Errors
//!
//! Error types for the CLI crate.

use derive_more::{Display, From};
use mgokit_core::AppError;

/// Main error enum for CLI operations.
#[derive(Debug, Display, From)]
pub enum CliError {
    /// IO Error wrapper.
    #[display("IO Error: {}", _0)]
    Io(std::io::Error),

    /// Failure reported by the generator library.
    #[display("{}", _0)]
    Core(AppError),

    /// A path argument that must be relative was not.
    #[from(ignore)]
    #[display("Invalid path '{}': must be relative to the working directory", _0)]
    InvalidPath(String),

    /// General failure message.
    #[display("Operation failed: {}", _0)]
    General(String),
}

/// Manual implementation of the standard Error trait.
///
/// `General(String)` holds a `String`, which does not implement `std::error::Error`, so a
/// derived `source()` would not compile.
impl std::error::Error for CliError {}

/// Result type alias.
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_convert() {
        let err: CliError = AppError::MissingPublicId("User".into()).into();
        assert_eq!(
            err.to_string(),
            "Struct 'User' has no `public_id: String` field"
        );
    }

    #[test]
    fn test_invalid_path_message() {
        let err = CliError::InvalidPath("/abs".into());
        assert!(err.to_string().contains("must be relative"));
    }
}
