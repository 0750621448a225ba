//! Load config from environment variables or a JSON document.

use crate::config::{validate, RegistryConfig};
use crate::error::ConfigError;

pub const ENV_DATABASE_URL: &str = "DEVICE_REGISTRY_DATABASE_URL";
pub const ENV_DEFAULT_NAME: &str = "DEVICE_REGISTRY_DEFAULT_NAME";
pub const ENV_AUTHORITY: &str = "DEVICE_REGISTRY_AUTHORITY";
pub const ENV_NOTIFY: &str = "DEVICE_REGISTRY_NOTIFY";
pub const ENV_MAX_CONNECTIONS: &str = "DEVICE_REGISTRY_MAX_CONNECTIONS";

impl RegistryConfig {
    /// Build config from `DEVICE_REGISTRY_*` env vars; unset vars keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse a JSON config document; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RegistryConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))?;
        validate(&config)?;
        Ok(config)
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = RegistryConfig::default();
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            config.database_url = url;
        }
        if let Some(name) = lookup(ENV_DEFAULT_NAME) {
            config.default_device_name = name;
        }
        if let Some(authority) = lookup(ENV_AUTHORITY) {
            config.authority = authority;
        }
        if let Some(policy) = lookup(ENV_NOTIFY) {
            config.notify_policy = policy.parse()?;
        }
        if let Some(n) = lookup(ENV_MAX_CONNECTIONS) {
            config.max_connections = n.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("{} must be a positive integer", ENV_MAX_CONNECTIONS))
            })?;
        }
        validate(&config)?;
        Ok(config)
    }
}
