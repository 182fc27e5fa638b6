//! SQLite-backed `CacheDao` adapter.
//!
//! Persists the `(pool, cache_hint, worker)` locality table behind a plain
//! `rusqlite` connection, offloading the blocking I/O to a blocking task per
//! call. All access from the pool core is already serialized by its own
//! mutex, so this adapter does no locking of its own beyond what SQLite
//! itself provides.

use buildpool_domain::{CacheHint, PoolName, WorkerName};
use buildpool_ports::BoxFuture;
use buildpool_ports::cache_dao::CacheDao;
use buildpool_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::spawn_blocking;

/// `CacheDao` implementation backed by a SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteCacheDao {
    path: PathBuf,
}

impl SqliteCacheDao {
    /// Open (creating if absent) the cache database at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CacheDao for SqliteCacheDao {
    fn mark_cached(
        &self,
        pool: PoolName,
        hint: CacheHint,
        worker: WorkerName,
    ) -> BoxFuture<'_, Result<()>> {
        let path = self.path.clone();
        Box::pin(async move {
            spawn_blocking(move || {
                let conn = open_connection(&path)?;
                let now = now_epoch_ms()?;
                conn.execute(
                    "INSERT OR REPLACE INTO cached (pool, cache_hint, worker, created) VALUES (?1, ?2, ?3, ?4)",
                    (pool.as_str(), hint.as_str(), worker.as_str(), now),
                )
                .map_err(|error| cache_error(&format!("cache insert failed: {error}")))?;
                Ok::<(), ErrorEnvelope>(())
            })
            .await
            .map_err(|error| cache_error(&format!("cache task failed: {error}")))??;
            Ok(())
        })
    }

    fn query_cache(&self, pool: PoolName, hint: CacheHint) -> BoxFuture<'_, Result<Vec<WorkerName>>> {
        let path = self.path.clone();
        Box::pin(async move {
            let names = spawn_blocking(move || {
                let conn = open_connection(&path)?;
                let mut statement = conn
                    .prepare(
                        "SELECT worker FROM cached WHERE pool = ?1 AND cache_hint = ?2 ORDER BY worker ASC",
                    )
                    .map_err(|error| cache_error(&format!("cache query prepare failed: {error}")))?;
                let rows = statement
                    .query_map((pool.as_str(), hint.as_str()), |row| row.get::<_, String>(0))
                    .map_err(|error| cache_error(&format!("cache query failed: {error}")))?;

                let mut names = Vec::new();
                for row in rows {
                    let name = row.map_err(|error| cache_error(&format!("cache row failed: {error}")))?;
                    let worker = WorkerName::parse(&name)
                        .map_err(|error| cache_error(&format!("cache row decode failed: {error}")))?;
                    names.push(worker);
                }
                Ok::<Vec<WorkerName>, ErrorEnvelope>(names)
            })
            .await
            .map_err(|error| cache_error(&format!("cache task failed: {error}")))??;
            Ok(names)
        })
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|error| cache_error(&format!("cache mkdir failed: {error}")))?;
        }
    }

    let conn =
        Connection::open(path).map_err(|error| cache_error(&format!("cache open failed: {error}")))?;

    conn.execute_batch("PRAGMA journal_mode = WAL;")
        .map_err(|error| cache_error(&format!("cache pragma failed: {error}")))?;

    init_schema(&conn)?;

    Ok(conn)
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS cached (
            pool       TEXT    NOT NULL,
            cache_hint TEXT    NOT NULL,
            worker     TEXT    NOT NULL,
            created    INTEGER NOT NULL,
            PRIMARY KEY (pool, cache_hint, worker)
         );",
    )
    .map_err(|error| cache_error(&format!("cache schema failed: {error}")))
}

fn now_epoch_ms() -> Result<i64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|error| cache_error(&format!("cache clock failed: {error}")))?;
    i64::try_from(duration.as_millis()).map_err(|error| cache_error(&format!("cache clock overflow: {error}")))
}

fn cache_error(message: &str) -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::new("cache", "disk"),
        message.to_string(),
        ErrorClass::NonRetriable,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn pool(name: &str) -> PoolName {
        PoolName::parse(name).expect("pool name")
    }

    fn worker(name: &str) -> WorkerName {
        WorkerName::parse(name).expect("worker name")
    }

    #[tokio::test]
    async fn mark_then_query_round_trips() {
        let dir = tempdir().expect("tempdir");
        let dao = SqliteCacheDao::new(dir.path().join("cache.sqlite3"));

        dao.mark_cached(pool("builds"), CacheHint::new("rustc-1.82"), worker("alpha"))
            .await
            .expect("mark alpha");
        dao.mark_cached(pool("builds"), CacheHint::new("rustc-1.82"), worker("bravo"))
            .await
            .expect("mark bravo");

        let found = dao
            .query_cache(pool("builds"), CacheHint::new("rustc-1.82"))
            .await
            .expect("query");
        assert_eq!(found, vec![worker("alpha"), worker("bravo")]);
    }

    #[tokio::test]
    async fn query_is_scoped_by_pool_and_hint() {
        let dir = tempdir().expect("tempdir");
        let dao = SqliteCacheDao::new(dir.path().join("cache.sqlite3"));

        dao.mark_cached(pool("builds"), CacheHint::new("a"), worker("alpha"))
            .await
            .expect("mark");
        dao.mark_cached(pool("other"), CacheHint::new("a"), worker("bravo"))
            .await
            .expect("mark");

        let found = dao.query_cache(pool("builds"), CacheHint::new("a")).await.expect("query");
        assert_eq!(found, vec![worker("alpha")]);
    }

    #[tokio::test]
    async fn cache_survives_a_fresh_dao_instance_against_the_same_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("cache.sqlite3");

        SqliteCacheDao::new(&path)
            .mark_cached(pool("builds"), CacheHint::new("a"), worker("alpha"))
            .await
            .expect("mark");

        let reopened = SqliteCacheDao::new(&path);
        let found = reopened
            .query_cache(pool("builds"), CacheHint::new("a"))
            .await
            .expect("query");
        assert_eq!(found, vec![worker("alpha")]);
    }

    #[tokio::test]
    async fn marking_again_refreshes_rather_than_duplicates() {
        let dir = tempdir().expect("tempdir");
        let dao = SqliteCacheDao::new(dir.path().join("cache.sqlite3"));

        dao.mark_cached(pool("builds"), CacheHint::new("a"), worker("alpha"))
            .await
            .expect("mark once");
        dao.mark_cached(pool("builds"), CacheHint::new("a"), worker("alpha"))
            .await
            .expect("mark twice");

        let found = dao.query_cache(pool("builds"), CacheHint::new("a")).await.expect("query");
        assert_eq!(found, vec![worker("alpha")]);
    }
}
