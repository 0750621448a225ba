//! Create and version the devices table. The version lives in `PRAGMA user_version`.
//! Upgrading from an older version drops the table and recreates it, destroying old rows.

use crate::error::RegistryError;
use crate::schema::DeviceSchema;
use sqlx::SqlitePool;

pub const SCHEMA_VERSION: i64 = 1;

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// DDL for the devices table. The id column uses AUTOINCREMENT so ids are never reused.
pub fn create_table_sql(schema: &DeviceSchema) -> String {
    let id_column = schema.id_field().column;
    let col_defs: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| {
            if f.column == id_column {
                format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote(f.column))
            } else {
                format!("{} {}", quote(f.column), f.kind.sql_type())
            }
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(schema.table_name()),
        col_defs.join(", ")
    )
}

/// Bring the database to `SCHEMA_VERSION`.
pub async fn apply_migrations(pool: &SqlitePool, schema: &DeviceSchema) -> Result<(), RegistryError> {
    let current: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
        .map_err(RegistryError::StoreReadFailed)?;

    if current > SCHEMA_VERSION {
        return Err(RegistryError::SchemaVersion {
            found: current,
            expected: SCHEMA_VERSION,
        });
    }

    let mut tx = pool.begin().await.map_err(RegistryError::StoreWriteFailed)?;
    if current != 0 && current < SCHEMA_VERSION {
        tracing::warn!(
            from = current,
            to = SCHEMA_VERSION,
            "upgrading device database, which will destroy all old data"
        );
        let drop = format!("DROP TABLE IF EXISTS {}", quote(schema.table_name()));
        tracing::debug!(sql = %drop, "query");
        sqlx::query(&drop)
            .execute(&mut *tx)
            .await
            .map_err(RegistryError::StoreWriteFailed)?;
    }

    let ddl = create_table_sql(schema);
    tracing::debug!(sql = %ddl, "query");
    sqlx::query(&ddl)
        .execute(&mut *tx)
        .await
        .map_err(RegistryError::StoreWriteFailed)?;

    // PRAGMA does not accept bound parameters.
    sqlx::query(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
        .execute(&mut *tx)
        .await
        .map_err(RegistryError::StoreWriteFailed)?;
    tx.commit().await.map_err(RegistryError::StoreWriteFailed)?;

    if current != SCHEMA_VERSION {
        tracing::info!(version = SCHEMA_VERSION, "device schema ready");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[test]
    fn ddl_comes_from_schema() {
        assert_eq!(
            create_table_sql(&DeviceSchema::devices()),
            r#"CREATE TABLE IF NOT EXISTS "devices" ("_id" INTEGER PRIMARY KEY AUTOINCREMENT, "user" TEXT, "name" TEXT, "address" TEXT, "selected" INTEGER)"#
        );
    }

    #[tokio::test]
    async fn fresh_database_gets_current_version() {
        let pool = memory_pool().await;
        apply_migrations(&pool, &DeviceSchema::devices()).await.unwrap();
        let v: i64 = sqlx::query_scalar("PRAGMA user_version").fetch_one(&pool).await.unwrap();
        assert_eq!(v, SCHEMA_VERSION);
        // Idempotent.
        apply_migrations(&pool, &DeviceSchema::devices()).await.unwrap();
    }

    #[tokio::test]
    async fn newer_database_is_refused() {
        let pool = memory_pool().await;
        sqlx::query("PRAGMA user_version = 99").execute(&pool).await.unwrap();
        let err = apply_migrations(&pool, &DeviceSchema::devices()).await.unwrap_err();
        assert!(matches!(err, RegistryError::SchemaVersion { found: 99, expected: SCHEMA_VERSION }));
    }
}
