//! Configuration error taxonomy.
//!
//! Every variant is fatal at startup: the engine refuses to run on
//! configuration it cannot load, parse or validate.

use std::path::PathBuf;
use thiserror::Error;
use validator::ValidationErrors;

/// Unified configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// One or more fields failed derive validation.
    #[error("Invalid configuration:\n{}", render_validation_errors(.0))]
    Validation(#[source] ValidationErrors),

    /// A relation between fields does not hold.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The merged figment could not be extracted.
    #[error("Configuration parsing error: {0}")]
    Parsing(#[from] figment::Error),

    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders field errors one per line, indented under their field name.
fn render_validation_errors(errors: &ValidationErrors) -> String {
    let mut lines = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        lines.push(format!("Field '{field}':"));
        for error in field_errors {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| error.code.to_string());
            lines.push(format!("  - {message}"));
        }
    }
    lines.join("\n")
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}
