//! Device registry: URI-routed CRUD over a single SQLite table, with change notification.

pub mod config;
pub mod error;
pub mod migration;
pub mod notify;
pub mod registry;
pub mod request;
pub mod router;
pub mod schema;
pub mod service;
pub mod sql;

pub use config::{NotifyPolicy, RegistryConfig};
pub use error::{ConfigError, RegistryError};
pub use migration::apply_migrations;
pub use notify::{BroadcastNotifier, ChangeEvent, ChangeNotifier, ChangeObserver, ChannelObserver, SubscriptionId};
pub use registry::DeviceRegistry;
pub use request::{encode_query, sanitise_host, user_request_url, RestMethod};
pub use router::{AddressRouter, Route};
pub use schema::{Device, DeviceSchema};
pub use service::{DeviceCursor, DeviceStore};
pub use sql::Selection;
