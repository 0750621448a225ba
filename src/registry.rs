//! Address-level entry point: resolve an address, run the operation on the store.

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::notify::{ChangeNotifier, ChangeObserver, SubscriptionId};
use crate::router::{AddressRouter, Route};
use crate::service::{DeviceCursor, DeviceStore};
use crate::sql::Selection;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub struct DeviceRegistry {
    router: AddressRouter,
    store: DeviceStore,
}

impl DeviceRegistry {
    pub async fn open(config: RegistryConfig, notifier: Arc<dyn ChangeNotifier>) -> Result<Self, RegistryError> {
        let router = AddressRouter::new(&config.authority)?;
        let store = DeviceStore::open(config, notifier).await?;
        Ok(DeviceRegistry { router, store })
    }

    pub fn from_store(store: DeviceStore) -> Result<Self, RegistryError> {
        let router = AddressRouter::new(&store.config().authority)?;
        Ok(DeviceRegistry { router, store })
    }

    pub fn router(&self) -> &AddressRouter {
        &self.router
    }

    pub fn store(&self) -> &DeviceStore {
        &self.store
    }

    pub fn resolve(&self, address: &str) -> Result<Route, RegistryError> {
        self.router.resolve(address)
    }

    pub fn subscribe(&self, observer: Arc<dyn ChangeObserver>) -> SubscriptionId {
        self.store.notifier().subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.store.notifier().unsubscribe(id)
    }

    /// MIME type of the address: the collection type or the single-device type.
    pub fn content_type(&self, address: &str) -> Result<&'static str, RegistryError> {
        Ok(self.resolve(address)?.content_type())
    }

    pub async fn query(
        &self,
        address: &str,
        fields: Option<&[&str]>,
        selection: Option<&Selection>,
        sort: Option<&str>,
    ) -> Result<DeviceCursor, RegistryError> {
        let route = self.resolve(address)?;
        self.store.query(&route, fields, selection, sort).await
    }

    /// Insert through the collection address only. Returns the new device's content URI.
    pub async fn insert(&self, address: &str, values: &HashMap<String, Value>) -> Result<String, RegistryError> {
        if self.resolve(address)? != Route::Collection {
            return Err(RegistryError::InvalidAddress(address.to_string()));
        }
        let id = self.store.insert(values).await?;
        Ok(Route::Item(id).content_uri(self.router.authority()))
    }

    pub async fn delete(&self, address: &str, selection: Option<&Selection>) -> Result<u64, RegistryError> {
        let route = self.resolve(address)?;
        self.store.delete(&route, selection).await
    }

    pub async fn update(
        &self,
        address: &str,
        values: &HashMap<String, Value>,
        selection: Option<&Selection>,
    ) -> Result<u64, RegistryError> {
        let route = self.resolve(address)?;
        self.store.update(&route, values, selection).await
    }
}
