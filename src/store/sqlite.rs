use crate::core::rate::Rate;
use crate::core::store::{RateStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS rates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code CHAR(3) NOT NULL,
    value VARCHAR(100) NOT NULL,
    published_at TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (code, published_at)
);
CREATE INDEX IF NOT EXISTS idx_rates_code ON rates (code);
CREATE INDEX IF NOT EXISTS idx_rates_published_at ON rates (published_at);
";

/// SQLite-backed rate store.
///
/// `published_at` is stored as RFC 3339 UTC text with second precision, so ordering
/// by the column is chronological and the unique index sees one key per instant.
#[derive(Clone)]
pub struct SqliteRateStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRateStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StoreError::backend)?;
        }
        let conn = Connection::open(path).map_err(StoreError::backend)?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(StoreError::backend)?;
        debug!(path = %path.display(), "Opened rate database");
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::backend)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Creates the `rates` table and its indexes if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        debug!("Running DB migrations");
        self.with_conn(|conn| conn.execute_batch(SCHEMA).map_err(StoreError::backend))
            .await
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StoreError::backend("rate database lock poisoned"))?;
            f(&conn)
        })
        .await
        .map_err(StoreError::backend)?
    }
}

fn storage_key(published_at: &DateTime<chrono::FixedOffset>) -> String {
    published_at
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn rate_from_row(row: &Row<'_>) -> rusqlite::Result<Rate> {
    let published_at: String = row.get(2)?;
    let published_at = DateTime::parse_from_rfc3339(&published_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    Ok(Rate {
        code: row.get(0)?,
        value: row.get(1)?,
        published_at,
    })
}

#[async_trait]
impl RateStore for SqliteRateStore {
    async fn insert(&self, rate: &Rate) -> Result<(), StoreError> {
        let rate = rate.clone();
        self.with_conn(move |conn| {
            let result = conn.execute(
                "INSERT INTO rates (code, value, published_at) VALUES (?1, ?2, ?3)",
                params![rate.code, rate.value, storage_key(&rate.published_at)],
            );
            match result {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    Err(StoreError::duplicate(&rate))
                }
                Err(e) => Err(StoreError::backend(e)),
            }
        })
        .await
    }

    async fn get_latest(&self, code: &str) -> Result<Rate, StoreError> {
        let code = code.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT code, value, published_at FROM rates
                 WHERE code = ?1 ORDER BY published_at DESC LIMIT 1",
                params![code],
                rate_from_row,
            )
            .optional()
            .map_err(StoreError::backend)?
            .ok_or_else(|| StoreError::not_found(&code))
        })
        .await
    }

    async fn get_all(&self, code: &str) -> Result<Vec<Rate>, StoreError> {
        let code = code.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT code, value, published_at FROM rates
                     WHERE code = ?1 ORDER BY published_at ASC",
                )
                .map_err(StoreError::backend)?;
            let rates = stmt
                .query_map(params![code], rate_from_row)
                .map_err(StoreError::backend)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(StoreError::backend)?;

            if rates.is_empty() {
                return Err(StoreError::not_found(&code));
            }
            Ok(rates)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use tempfile::tempdir;

    fn rate(code: &str, value: &str, published_at: &str) -> Rate {
        Rate::new(code, value, DateTime::parse_from_rfc3339(published_at).unwrap())
    }

    async fn migrated_store() -> SqliteRateStore {
        let store = SqliteRateStore::open_in_memory().unwrap();
        store.migrate().await.unwrap();
        store
    }

    async fn row_count(store: &SqliteRateStore) -> i64 {
        store
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM rates", [], |row| row.get(0))
                    .map_err(StoreError::backend)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_then_duplicate() {
        let store = migrated_store().await;
        let r = rate("AUD", "1.76500000", "2025-10-10T00:00:00+03:00");

        store.insert(&r).await.unwrap();
        let second = store.insert(&r).await;

        assert!(matches!(second, Err(StoreError::Duplicate { .. })));
        assert_eq!(row_count(&store).await, 1);
    }

    #[tokio::test]
    async fn test_same_instant_different_offset_is_duplicate() {
        let store = migrated_store().await;

        store
            .insert(&rate("AUD", "1.76500000", "2025-10-10T00:00:00+03:00"))
            .await
            .unwrap();
        let result = store
            .insert(&rate("AUD", "1.76500000", "2025-10-09T21:00:00Z"))
            .await;

        assert!(matches!(result, Err(StoreError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn test_latest_and_history_ordering() {
        let store = migrated_store().await;
        for r in [
            rate("AUD", "1.77750000", "2025-10-13T00:00:00+03:00"),
            rate("BGN", "1.95580000", "2025-10-13T00:00:00+03:00"),
            rate("AUD", "1.76500000", "2025-10-10T00:00:00+03:00"),
        ] {
            store.insert(&r).await.unwrap();
        }

        let latest = store.get_latest("AUD").await.unwrap();
        assert_eq!(latest.value, "1.77750000");
        assert_eq!(
            latest.published_at,
            DateTime::parse_from_rfc3339("2025-10-13T00:00:00+03:00").unwrap()
        );

        let history = store.get_all("AUD").await.unwrap();
        let values: Vec<&str> = history.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["1.76500000", "1.77750000"]);
    }

    #[tokio::test]
    async fn test_not_found() {
        let store = migrated_store().await;

        assert!(matches!(
            store.get_latest("CHF").await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.get_all("CHF").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_table_is_backend_error() {
        let store = SqliteRateStore::open_in_memory().unwrap();

        let result = store
            .insert(&rate("AUD", "1.76500000", "2025-10-10T00:00:00+03:00"))
            .await;

        assert!(matches!(result, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn test_concurrent_inserts_of_same_key() {
        let store = migrated_store().await;
        let r = rate("AUD", "1.76500000", "2025-10-10T00:00:00+03:00");

        let results = join_all((0..8).map(|_| store.insert(&r))).await;

        assert_eq!(results.iter().filter(|res| res.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter(|res| res.is_err())
                .all(|res| matches!(res, Err(StoreError::Duplicate { .. })))
        );
        assert_eq!(row_count(&store).await, 1);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("rates.db");

        {
            let store = SqliteRateStore::open(&path).unwrap();
            store.migrate().await.unwrap();
            store
                .insert(&rate("GBP", "0.86900000", "2025-10-10T00:00:00+03:00"))
                .await
                .unwrap();
        }

        let store = SqliteRateStore::open(&path).unwrap();
        store.migrate().await.unwrap();
        assert_eq!(store.get_latest("GBP").await.unwrap().value, "0.86900000");
    }
}
