//! Example consumer: opens the registry, watches for changes, and exercises each operation.
//!
//! Run from repo root: `cargo run -p demo-consumer`
//! Settings come from `DEVICE_REGISTRY_*` env vars (a `.env` file is honored).

use device_registry::{
    encode_query, user_request_url, BroadcastNotifier, ChangeEvent, DeviceRegistry, RegistryConfig, RestMethod,
    Selection,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

fn values(v: Value) -> HashMap<String, Value> {
    match v {
        Value::Object(m) => m.into_iter().collect(),
        _ => HashMap::new(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("device_registry=info,demo_consumer=info")),
        )
        .init();

    let config = RegistryConfig::from_env()?;
    let registry = DeviceRegistry::open(config, Arc::new(BroadcastNotifier::new())).await?;
    registry.subscribe(Arc::new(|e: &ChangeEvent| {
        tracing::info!(uri = %e.uri, "devices changed");
    }));

    let account = "someone@example.com";
    for name in ["Laptop", "Phone"] {
        let uri = registry
            .insert("devices", &values(json!({ "user": account, "name": name })))
            .await?;
        tracing::info!(%uri, "inserted");
    }
    registry.insert("devices", &values(json!({ "user": account }))).await?;

    registry
        .update(
            "devices",
            &values(json!({ "selected": true })),
            Some(&Selection::field_eq("name", "Phone")),
        )
        .await?;

    let mine = Selection::field_eq("user", account);
    for device in registry.query("devices", None, Some(&mine), None).await?.to_devices()? {
        tracing::info!(id = device.id, address = %device.address, selected = device.selected, "device");
    }

    let query = encode_query(&[("user", account), ("device", "Phone")]);
    tracing::info!(
        method = RestMethod::Get.as_str(),
        url = %user_request_url("https://example.com/", &query),
        "user request"
    );

    let removed = registry.delete("devices", Some(&mine)).await?;
    tracing::info!(removed, "cleaned up");
    registry.store().close().await;
    Ok(())
}
