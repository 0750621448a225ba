//! Typed errors: caller-input failures versus storage failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing config value: {0}")]
    Missing(&'static str),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("unknown address: {0}")]
    InvalidAddress(String),
    #[error("unknown field: {0}")]
    InvalidField(String),
    #[error("field {field} must be {expected}")]
    InvalidFieldValue { field: String, expected: &'static str },
    #[error("devices must have a {0} associated with them")]
    MissingRequiredField(&'static str),
    #[error("update requires at least one field")]
    EmptyUpdate,
    #[error("store read failed: {0}")]
    StoreReadFailed(#[source] sqlx::Error),
    #[error("store write failed: {0}")]
    StoreWriteFailed(#[source] sqlx::Error),
    #[error("failed to insert row into {0}")]
    InsertFailed(String),
    #[error("database schema version {found} is newer than supported version {expected}")]
    SchemaVersion { found: i64, expected: i64 },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RegistryError {
    /// True when the request itself was malformed; false when the store or its setup failed.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            RegistryError::InvalidAddress(_)
                | RegistryError::InvalidField(_)
                | RegistryError::InvalidFieldValue { .. }
                | RegistryError::MissingRequiredField(_)
                | RegistryError::EmptyUpdate
        )
    }
}
