//! # Error Handling
//!
//! Provides the unified `AppError` enum used across the workspace.

use derive_more::{Display, From};

/// The Global Error Enum.
///
/// We use `derive_more` for boilerplate.
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// Wrapper for standard IO errors.
    #[display("IO Error: {_0}")]
    Io(std::io::Error),

    /// Source that could not be read into a module description.
    #[from(ignore)]
    #[display("Parse Error: {_0}")]
    Parse(String),

    /// A struct-level generator was pointed at a struct without a `public_id: String` field.
    #[from(ignore)]
    #[display("Struct '{_0}' has no `public_id: String` field")]
    MissingPublicId(String),

    /// A template rendered source that is not valid Rust.
    #[from(ignore)]
    #[display("Invalid generated output for {_0}: {_1}")]
    InvalidOutput(String, String),

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_io_conversion() {
        let io_err = Error::new(ErrorKind::Other, "test");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
    }

    #[test]
    fn test_string_conversion() {
        let msg = String::from("something wrong");
        let app_err: AppError = msg.into();
        match app_err {
            AppError::General(s) => assert_eq!(s, "something wrong"),
            _ => panic!("String should convert to AppError::General"),
        }
    }

    #[test]
    fn test_missing_public_id_display() {
        let app_err = AppError::MissingPublicId("User".into());
        assert_eq!(
            format!("{}", app_err),
            "Struct 'User' has no `public_id: String` field"
        );
    }

    #[test]
    fn test_invalid_output_display() {
        let app_err = AppError::InvalidOutput("user_db/mod.rs".into(), "expected `;`".into());
        assert_eq!(
            app_err.to_string(),
            "Invalid generated output for user_db/mod.rs: expected `;`"
        );
    }
}
