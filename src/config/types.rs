//! Registry configuration: storage location, defaults, and notification policy.

use serde::{Deserialize, Serialize};

/// Authority of the device provider; also the host part of its content URIs.
pub const DEFAULT_AUTHORITY: &str = "com.suchagit.android2cloud.providers.TwoCloud";

/// Name given to devices inserted without one.
pub const DEFAULT_DEVICE_NAME: &str = "My Device";

pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

/// When mutating operations publish change events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyPolicy {
    /// Notify after every delete/update, including those that matched no rows.
    #[default]
    Always,
    /// Skip notifications for deletes/updates that affected zero rows.
    OnChange,
}

impl std::str::FromStr for NotifyPolicy {
    type Err = crate::error::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(NotifyPolicy::Always),
            "on_change" | "on-change" => Ok(NotifyPolicy::OnChange),
            _ => Err(crate::error::ConfigError::Validation(format!(
                "invalid notify policy: {} (expected always or on_change)",
                s
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_device_name")]
    pub default_device_name: String,
    #[serde(default = "default_authority")]
    pub authority: String,
    #[serde(default)]
    pub notify_policy: NotifyPolicy,
    /// Ignored for in-memory databases, which always use a single connection.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.into()
}

fn default_device_name() -> String {
    DEFAULT_DEVICE_NAME.into()
}

fn default_authority() -> String {
    DEFAULT_AUTHORITY.into()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            database_url: default_database_url(),
            default_device_name: default_device_name(),
            authority: default_authority(),
            notify_policy: NotifyPolicy::default(),
            max_connections: default_max_connections(),
        }
    }
}

impl RegistryConfig {
    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}
