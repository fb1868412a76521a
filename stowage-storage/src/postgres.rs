//! PostgreSQL document storage.
//!
//! Each collection is a table of JSONB documents:
//!
//! ```sql
//! CREATE TABLE <collection> (
//!     seq BIGSERIAL,
//!     id  TEXT PRIMARY KEY,
//!     doc JSONB NOT NULL
//! );
//! ```
//!
//! `seq` keeps enumeration in insertion order. Filters are pushed down as a
//! JSONB containment query and then re-checked for exact equality.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use serde_json::Value;
use stowage_core::{
    from_payload, to_payload, Document, Filter, Payload, Record, RecordId, Storage, StorageError,
    StorageResult,
};
use tokio_postgres::NoTls;

fn pg_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::backend("postgres", e)
}

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DocumentStoreConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection timeout
    pub timeout: Duration,
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "stowage".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DocumentStoreConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("STOWAGE_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("STOWAGE_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("STOWAGE_DB_NAME").unwrap_or_else(|_| "stowage".to_string()),
            user: std::env::var("STOWAGE_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("STOWAGE_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("STOWAGE_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("STOWAGE_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> StorageResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.connect_timeout = Some(self.timeout);

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| pg_error(format!("Failed to create pool: {e}")))
    }
}

/// Collection names become table names, so only plain identifiers pass.
fn validate_collection(name: &str) -> StorageResult<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && name.len() <= 63 {
        Ok(())
    } else {
        Err(StorageError::InvalidPayload {
            reason: format!("invalid collection name: {name:?}"),
        })
    }
}

/// PostgreSQL-backed storage for one collection.
pub struct DocumentStorage<T> {
    pool: Pool,
    table: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DocumentStorage<T> {
    /// Bind a collection and create its table if it does not exist.
    pub async fn connect(pool: Pool, collection: &str) -> StorageResult<Self> {
        validate_collection(collection)?;
        let storage = Self {
            pool,
            table: collection.to_string(),
            _marker: PhantomData,
        };
        storage.ensure_schema().await?;
        Ok(storage)
    }

    /// Collection (table) name.
    pub fn collection(&self) -> &str {
        &self.table
    }

    async fn conn(&self) -> StorageResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(pg_error)
    }

    async fn ensure_schema(&self) -> StorageResult<()> {
        let conn = self.conn().await?;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} \
             (seq BIGSERIAL, id TEXT PRIMARY KEY, doc JSONB NOT NULL)",
            self.table
        );
        conn.batch_execute(&ddl).await.map_err(pg_error)
    }

    /// Drop the collection table. Used by tests to clean up.
    pub async fn drop_collection(&self) -> StorageResult<()> {
        let conn = self.conn().await?;
        conn.batch_execute(&format!("DROP TABLE IF EXISTS {}", self.table))
            .await
            .map_err(pg_error)
    }

    async fn upsert(&self, id: &RecordId, payload: Payload) -> StorageResult<()> {
        let conn = self.conn().await?;
        let doc = Value::Object(payload);
        let sql = format!(
            "INSERT INTO {} (id, doc) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc",
            self.table
        );
        conn.execute(&sql, &[&id.as_str(), &doc])
            .await
            .map_err(pg_error)?;
        Ok(())
    }
}

fn into_payload(doc: Value) -> StorageResult<Payload> {
    match doc {
        Value::Object(map) => Ok(map),
        _ => Err(StorageError::Serialization {
            reason: "stored document is not a JSON object".to_string(),
        }),
    }
}

#[async_trait]
impl<T: Document> Storage<T> for DocumentStorage<T> {
    async fn create(&self, data: T) -> StorageResult<RecordId> {
        let payload = to_payload(&data)?;
        let id = RecordId::generate();
        self.upsert(&id, payload).await?;
        Ok(id)
    }

    async fn read(&self, id: &RecordId) -> StorageResult<Option<Record<T>>> {
        let conn = self.conn().await?;
        let sql = format!("SELECT doc FROM {} WHERE id = $1", self.table);
        let row = conn
            .query_opt(&sql, &[&id.as_str()])
            .await
            .map_err(pg_error)?;

        match row {
            Some(row) => {
                let doc: Value = row.get(0);
                Ok(Some(from_payload(id.clone(), into_payload(doc)?)?))
            }
            None => Ok(None),
        }
    }

    async fn update(&self, id: &RecordId, data: T) -> StorageResult<()> {
        let payload = to_payload(&data)?;
        self.upsert(id, payload).await
    }

    async fn remove(&self, id: &RecordId) -> StorageResult<()> {
        let conn = self.conn().await?;
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table);
        conn.execute(&sql, &[&id.as_str()])
            .await
            .map_err(pg_error)?;
        Ok(())
    }

    async fn list(&self) -> StorageResult<Vec<RecordId>> {
        let conn = self.conn().await?;
        let sql = format!("SELECT id FROM {} ORDER BY seq", self.table);
        let rows = conn.query(&sql, &[]).await.map_err(pg_error)?;
        Ok(rows
            .iter()
            .map(|row| RecordId::new(row.get::<_, String>(0)))
            .collect())
    }

    async fn find(&self, filter: &Filter) -> StorageResult<Vec<Record<T>>> {
        let conn = self.conn().await?;
        let rows = if filter.is_empty() {
            let sql = format!("SELECT id, doc FROM {} ORDER BY seq", self.table);
            conn.query(&sql, &[]).await
        } else {
            let sql = format!(
                "SELECT id, doc FROM {} WHERE doc @> $1 ORDER BY seq",
                self.table
            );
            let pattern = Value::Object(filter.to_object());
            conn.query(&sql, &[&pattern]).await
        }
        .map_err(pg_error)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get(0);
            let payload = into_payload(row.get(1))?;
            // Containment is looser than equality for nested values.
            if filter.matches(&payload) {
                records.push(from_payload(RecordId::new(id), payload)?);
            }
        }
        Ok(records)
    }

    async fn count(&self) -> StorageResult<u64> {
        let conn = self.conn().await?;
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let row = conn.query_one(&sql, &[]).await.map_err(pg_error)?;
        let count: i64 = row.get(0);
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names() {
        assert!(validate_collection("users").is_ok());
        assert!(validate_collection("_user_docs_2").is_ok());
        assert!(validate_collection("").is_err());
        assert!(validate_collection("2users").is_err());
        assert!(validate_collection("users; DROP TABLE x").is_err());
        assert!(validate_collection(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = DocumentStoreConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "stowage");
        assert_eq!(config.max_size, 16);
    }
}
