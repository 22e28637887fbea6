//! Database connection and repositories for the image cache index

pub mod apod_cache;

use std::path::Path;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::info;

use crate::error::FetchError;

pub use apod_cache::{ApodCacheRepository, CacheEntry, CreateCacheEntry, NO_ENTRY};

/// How long a connection waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database wrapper providing connection pool access
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the SQLite index file at `path`.
    ///
    /// WAL mode plus a busy timeout lets several processes share one cache.
    pub async fn connect(path: &Path, max_connections: u32) -> Result<Self, FetchError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Ensure every table exists
    pub async fn initialize(&self) -> Result<(), FetchError> {
        self.apod_cache().initialize().await?;
        info!("Image cache DB ready");
        Ok(())
    }

    /// Get the image cache repository
    pub fn apod_cache(&self) -> ApodCacheRepository {
        ApodCacheRepository::new(self.pool.clone())
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
