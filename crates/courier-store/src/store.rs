//! The [`HistoryStore`] trait and its `SQLite` implementation.

use std::path::Path;

use async_trait::async_trait;
use courier_core::events::ChatRecord;
use tracing::instrument;

use crate::errors::Result;
use crate::sqlite::connection::{self, ConnectionConfig, ConnectionPool};
use crate::sqlite::migrations::run_migrations;
use crate::sqlite::repositories::message::MessageRepo;

/// Durable append/read of messages keyed by device identity.
///
/// The relay core depends on this seam, not on the storage engine.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append one message under an identity, returning the stored record.
    async fn append(&self, device_id: &str, content: &str) -> Result<ChatRecord>;

    /// Full ordered history for an identity. Unknown identities yield an
    /// empty sequence, never an error.
    async fn read_all(&self, device_id: &str) -> Result<Vec<ChatRecord>>;
}

/// `SQLite`-backed [`HistoryStore`].
///
/// Synchronous rusqlite work runs on the blocking thread pool so callers
/// suspend at the await instead of stalling the runtime.
#[derive(Clone, Debug)]
pub struct SqliteHistory {
    pool: ConnectionPool,
}

impl SqliteHistory {
    /// Wrap an existing pool. Assumes migrations have run.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Open (or create) the database at `path` and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let pool = connection::open(path, &ConnectionConfig::default())?;
        let conn = pool.get()?;
        run_migrations(&conn)?;
        drop(conn);
        Ok(Self { pool })
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self> {
        let pool = connection::new_in_memory(&ConnectionConfig::default())?;
        let conn = pool.get()?;
        run_migrations(&conn)?;
        drop(conn);
        Ok(Self { pool })
    }

    /// The underlying pool (for custom queries and maintenance).
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    #[instrument(skip(self, content))]
    async fn append(&self, device_id: &str, content: &str) -> Result<ChatRecord> {
        let pool = self.pool.clone();
        let device_id = device_id.to_string();
        let content = content.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            MessageRepo::insert(&conn, &device_id, &content)
        })
        .await?
    }

    #[instrument(skip(self))]
    async fn read_all(&self, device_id: &str) -> Result<Vec<ChatRecord>> {
        let pool = self.pool.clone();
        let device_id = device_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            MessageRepo::list_by_device(&conn, &device_id)
        })
        .await?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
