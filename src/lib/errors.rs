//! Custom error types for spyrun operations.

use thiserror::Error;

/// Result type alias for spyrun operations
pub type Result<T> = std::result::Result<T, SpyrunError>;

/// Error type for spyrun operations
#[derive(Error, Debug)]
pub enum SpyrunError {
    /// An override key that is not part of the parameter schema
    #[error("Unknown parameter '{name}'")]
    UnknownOption {
        /// The unrecognized parameter name
        name: String,
    },

    /// An override value whose type disagrees with the schema
    #[error("Invalid type for parameter '{parameter}': expected {expected}, got {actual}")]
    TypeMismatch {
        /// The parameter name
        parameter: String,
        /// The type the schema declares
        expected: &'static str,
        /// The type that was supplied
        actual: String,
    },

    /// The recording's geometry is invalid or could not be serialized
    #[error("Invalid probe geometry for '{path}': {reason}")]
    GeometryExport {
        /// Path of the file the geometry belongs to
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// The config template is missing, malformed, or disagrees with its bindings
    #[error("Config template error: {reason}")]
    Template {
        /// Explanation of the problem
        reason: String,
    },

    /// The external tool could not be started at all
    #[error("Failed to launch '{command}': {source}")]
    Launch {
        /// The command line that was being launched
        command: String,
        /// The underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The external tool ran but exited with a non-zero status
    #[error("spyking-circus returned a non-zero exit code: {exit_code}")]
    ExternalToolFailure {
        /// The raw exit code, preserved for diagnostics
        exit_code: i32,
    },

    /// The sorter's output directory is missing or malformed
    #[error("Invalid sorter output in '{path}': {reason}")]
    ResultParse {
        /// Path of the offending file or directory
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// Filesystem error while generating or reading workspace artifacts
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
