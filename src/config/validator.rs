//! Config validation.

use crate::config::RegistryConfig;
use crate::error::ConfigError;

pub fn validate(config: &RegistryConfig) -> Result<(), ConfigError> {
    if config.database_url.trim().is_empty() {
        return Err(ConfigError::Missing("database_url"));
    }
    if config.default_device_name.trim().is_empty() {
        return Err(ConfigError::Validation("default_device_name must not be empty".into()));
    }
    // Checked untrimmed: the authority is copied verbatim into content URIs.
    let authority = config.authority.as_str();
    if authority.trim().is_empty() {
        return Err(ConfigError::Missing("authority"));
    }
    if authority.contains('/') || authority.contains(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "authority must not contain '/' or whitespace: {}",
            config.authority
        )));
    }
    if config.max_connections == 0 {
        return Err(ConfigError::Validation("max_connections must be at least 1".into()));
    }
    Ok(())
}
