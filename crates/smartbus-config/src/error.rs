//! Configuration error types.

use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path of the file.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The config text is not valid TOML for the expected schema.
    #[error("failed to parse config {path}: {source}")]
    ParseError {
        /// Path of the file, or `<string>` for in-memory input.
        path: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// A field holds an unacceptable value.
    #[error("invalid config field {field}: {message}")]
    ValidationError {
        /// Dotted field path.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
