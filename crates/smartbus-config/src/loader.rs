//! Loading configuration from TOML text or files.

use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::types::BusConfig;
use crate::validate;

impl BusConfig {
    /// Parse and validate a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] for malformed input and
    /// [`ConfigError::ValidationError`] for rejected values.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        parse(text, "<string>")
    }

    /// Read, parse and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file cannot be read, and
    /// the errors of [`from_toml_str`](Self::from_toml_str) otherwise.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.display().to_string(),
            source,
        })?;
        let config = parse(&text, &path.display().to_string())?;
        debug!(path = %path.display(), bus = %config.identifier, "loaded bus config");
        Ok(config)
    }

    /// Validate this configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found.
    pub fn validate(&self) -> ConfigResult<()> {
        validate::validate(self)
    }
}

fn parse(text: &str, origin: &str) -> ConfigResult<BusConfig> {
    let config: BusConfig = toml::from_str(text).map_err(|source| ConfigError::ParseError {
        path: origin.to_owned(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}
