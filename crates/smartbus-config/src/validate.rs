//! Configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::BusConfig;

/// Validate a deserialized bus configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &BusConfig) -> ConfigResult<()> {
    if config.identifier.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "identifier".to_owned(),
            message: "bus identifier must not be blank".to_owned(),
        });
    }

    if config
        .log
        .as_ref()
        .is_some_and(|log| log.level.trim().is_empty())
    {
        return Err(ConfigError::ValidationError {
            field: "log.level".to_owned(),
            message: "log level must not be blank".to_owned(),
        });
    }

    Ok(())
}
