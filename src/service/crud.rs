//! Device CRUD execution against SQLite.

use crate::config::{NotifyPolicy, RegistryConfig};
use crate::error::{ConfigError, RegistryError};
use crate::migration::apply_migrations;
use crate::notify::{ChangeEvent, ChangeNotifier};
use crate::router::Route;
use crate::schema::{Device, DeviceSchema, FieldKind, FieldSpec};
use crate::service::ValuesValidator;
use crate::sql::{bind_params, delete, insert, select, update, QueryBuf, Selection};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Rows returned by a query, in sort order. Iterate as often as needed.
///
/// This is a materialized snapshot: every matching row is fetched when the query
/// runs, so later writes do not show up in an existing cursor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceCursor {
    rows: Vec<Value>,
}

impl DeviceCursor {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Each row is a JSON object keyed by the projected field names.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.rows.iter()
    }

    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    /// Full devices; fails if the query projected only some fields.
    pub fn to_devices(&self) -> Result<Vec<Device>, serde_json::Error> {
        self.rows.iter().cloned().map(Device::try_from).collect()
    }
}

impl<'a> IntoIterator for &'a DeviceCursor {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Sole owner of the devices table. Writes are serialized; reads run concurrently.
pub struct DeviceStore {
    pool: SqlitePool,
    schema: Arc<DeviceSchema>,
    notifier: Arc<dyn ChangeNotifier>,
    config: Arc<RegistryConfig>,
    write_gate: Mutex<()>,
}

impl DeviceStore {
    /// Connect to `config.database_url`, creating the database and table if needed.
    pub async fn open(config: RegistryConfig, notifier: Arc<dyn ChangeNotifier>) -> Result<Self, RegistryError> {
        crate::config::validate(&config)?;
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| ConfigError::Load(format!("database_url: {}", e)))?
            .create_if_missing(true);
        // An in-memory database lives only as long as its connection, so keep exactly one open.
        let pool = if config.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .connect_with(options.journal_mode(SqliteJournalMode::Wal))
                .await
        }
        .map_err(RegistryError::StoreReadFailed)?;
        tracing::info!(database_url = %config.database_url, "device store opened");
        Self::with_pool(pool, config, notifier).await
    }

    /// Use an existing pool. Applies migrations.
    pub async fn with_pool(
        pool: SqlitePool,
        config: RegistryConfig,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Result<Self, RegistryError> {
        let schema = Arc::new(DeviceSchema::devices());
        apply_migrations(&pool, &schema).await?;
        Ok(DeviceStore {
            pool,
            schema,
            notifier,
            config: Arc::new(config),
            write_gate: Mutex::new(()),
        })
    }

    pub fn schema(&self) -> &DeviceSchema {
        &self.schema
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn notifier(&self) -> &Arc<dyn ChangeNotifier> {
        &self.notifier
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Rows for the route. `fields` empty/None returns every field; `sort` blank/None uses `address ASC`.
    pub async fn query(
        &self,
        route: &Route,
        fields: Option<&[&str]>,
        selection: Option<&Selection>,
        sort: Option<&str>,
    ) -> Result<DeviceCursor, RegistryError> {
        let projection = self.schema.projection(fields)?;
        let sort = self.schema.sort_order(sort)?;
        let q = select(&self.schema, &projection, route, selection, &sort)?;
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_params(sqlx::query(&q.sql), &q.params)
            .fetch_all(&self.pool)
            .await
            .map_err(RegistryError::StoreReadFailed)?;
        let rows = rows
            .iter()
            .map(|r| row_to_json(r, &projection))
            .collect::<Result<Vec<_>, _>>()
            .map_err(RegistryError::StoreReadFailed)?;
        Ok(DeviceCursor { rows })
    }

    /// Fetch one device by id.
    pub async fn get(&self, id: i64) -> Result<Option<Device>, RegistryError> {
        let cursor = self.query(&Route::Item(id), None, None, None).await?;
        match cursor.rows.into_iter().next() {
            Some(row) => Device::try_from(row)
                .map(Some)
                .map_err(|e| RegistryError::StoreReadFailed(sqlx::Error::Decode(Box::new(e)))),
            None => Ok(None),
        }
    }

    /// Insert one device, filling defaults. Returns the new id and notifies with its item route.
    pub async fn insert(&self, values: &HashMap<String, Value>) -> Result<i64, RegistryError> {
        let prepared = ValuesValidator::prepare_insert(&self.schema, values, &self.config.default_device_name)?;
        let q = insert(&self.schema, &prepared);
        let _guard = self.write_gate.lock().await;
        let result = self.execute(&q).await?;
        let id = result.last_insert_rowid();
        if id <= 0 {
            return Err(RegistryError::InsertFailed(self.schema.table_name().to_string()));
        }
        self.notifier
            .notify(&ChangeEvent::new(Route::Item(id), &self.config.authority));
        Ok(id)
    }

    /// Delete matching rows. A collection route without a selection deletes every row.
    pub async fn delete(&self, route: &Route, selection: Option<&Selection>) -> Result<u64, RegistryError> {
        let q = delete(&self.schema, route, selection)?;
        let _guard = self.write_gate.lock().await;
        let count = self.execute(&q).await?.rows_affected();
        self.notify_after_write(route, count);
        Ok(count)
    }

    /// Set `values` on matching rows. `id` cannot be changed.
    pub async fn update(
        &self,
        route: &Route,
        values: &HashMap<String, Value>,
        selection: Option<&Selection>,
    ) -> Result<u64, RegistryError> {
        let prepared = ValuesValidator::prepare_update(&self.schema, values)?;
        let q = update(&self.schema, route, &prepared, selection)?;
        let _guard = self.write_gate.lock().await;
        let count = self.execute(&q).await?.rows_affected();
        self.notify_after_write(route, count);
        Ok(count)
    }

    /// Run one statement in its own transaction.
    async fn execute(&self, q: &QueryBuf) -> Result<sqlx::sqlite::SqliteQueryResult, RegistryError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut tx = self.pool.begin().await.map_err(RegistryError::StoreWriteFailed)?;
        let result = bind_params(sqlx::query(&q.sql), &q.params)
            .execute(&mut *tx)
            .await
            .map_err(RegistryError::StoreWriteFailed)?;
        tx.commit().await.map_err(RegistryError::StoreWriteFailed)?;
        Ok(result)
    }

    fn notify_after_write(&self, route: &Route, count: u64) {
        if count == 0 && self.config.notify_policy == NotifyPolicy::OnChange {
            tracing::debug!(route = %route, "no rows affected; notification suppressed");
            return;
        }
        self.notifier
            .notify(&ChangeEvent::new(*route, &self.config.authority));
    }
}

/// Decode a row by the kinds of the projected fields. Booleans are stored as integers.
fn row_to_json(row: &SqliteRow, fields: &[&FieldSpec]) -> Result<Value, sqlx::Error> {
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for f in fields {
        let v = match f.kind {
            FieldKind::Integer => row.try_get::<Option<i64>, _>(f.name)?.map(Value::from),
            FieldKind::Text => row.try_get::<Option<String>, _>(f.name)?.map(Value::String),
            FieldKind::Boolean => row
                .try_get::<Option<i64>, _>(f.name)?
                .map(|n| Value::Bool(n != 0)),
        };
        map.insert(f.name.to_string(), v.unwrap_or(Value::Null));
    }
    Ok(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::BroadcastNotifier;
    use serde_json::json;

    async fn store() -> DeviceStore {
        DeviceStore::open(RegistryConfig::default(), Arc::new(BroadcastNotifier::new()))
            .await
            .unwrap()
    }

    fn values(v: Value) -> HashMap<String, Value> {
        match v {
            Value::Object(m) => m.into_iter().collect(),
            _ => panic!("test values must be an object"),
        }
    }

    #[tokio::test]
    async fn inserted_row_reads_back_typed() {
        let store = store().await;
        let id = store.insert(&values(json!({"user": "a@b.com", "selected": true}))).await.unwrap();
        let device = store.get(id).await.unwrap().unwrap();
        assert_eq!(
            device,
            Device {
                id,
                user: "a@b.com".into(),
                name: "My Device".into(),
                address: "a@b.com/My Device".into(),
                selected: true,
            }
        );
        assert!(store.get(id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn partial_projection_returns_only_requested_fields() {
        let store = store().await;
        store.insert(&values(json!({"user": "u"}))).await.unwrap();
        let cursor = store
            .query(&Route::Collection, Some(&["name", "selected"]), None, None)
            .await
            .unwrap();
        assert_eq!(cursor.rows(), &[json!({"name": "My Device", "selected": false})]);
        assert!(cursor.to_devices().is_err());
    }

    #[tokio::test]
    async fn cursor_can_be_iterated_twice() {
        let store = store().await;
        store.insert(&values(json!({"user": "u", "name": "b"}))).await.unwrap();
        store.insert(&values(json!({"user": "u", "name": "a"}))).await.unwrap();
        let cursor = store.query(&Route::Collection, Some(&["name"]), None, None).await.unwrap();
        let first: Vec<_> = cursor.iter().cloned().collect();
        let second: Vec<_> = (&cursor).into_iter().cloned().collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![json!({"name": "a"}), json!({"name": "b"})]);
    }

    #[tokio::test]
    async fn malformed_raw_selection_is_a_read_failure() {
        let store = store().await;
        let sel = Selection::raw("this is not sql", vec![]);
        let err = store.query(&Route::Collection, None, Some(&sel), None).await.unwrap_err();
        assert!(matches!(err, RegistryError::StoreReadFailed(_)));
        assert!(!err.is_caller_error());
    }
}
