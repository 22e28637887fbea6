//! Image cache index repository
//!
//! One row per distinct image. The `sha256` column is UNIQUE, which is what
//! keeps concurrent fetches of the same image from creating two rows.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::FetchError;

/// Reserved id meaning "no entry". AUTOINCREMENT rowids start at 1.
pub const NO_ENTRY: i64 = 0;

// ============================================================================
// Records
// ============================================================================

/// A cached APOD image as stored in the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub id: i64,
    pub title: String,
    pub explanation: String,
    pub file_path: String,
    pub sha256: String,
}

impl CacheEntry {
    /// First 12 characters of the hash, for listings
    pub fn short_sha256(&self) -> &str {
        self.sha256.get(..12).unwrap_or(&self.sha256)
    }
}

/// Input for creating a cache entry
#[derive(Debug, Clone)]
pub struct CreateCacheEntry {
    pub title: String,
    pub explanation: String,
    pub file_path: String,
    pub sha256: String,
}

type CacheEntryRow = (i64, String, String, String, String);

fn row_to_entry(r: CacheEntryRow) -> CacheEntry {
    CacheEntry {
        id: r.0,
        title: r.1,
        explanation: r.2,
        file_path: r.3,
        sha256: r.4,
    }
}

// ============================================================================
// Repository
// ============================================================================

pub struct ApodCacheRepository {
    pool: SqlitePool,
}

impl ApodCacheRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the `apod` table if it does not exist. Safe to call on every start.
    pub async fn initialize(&self) -> Result<(), FetchError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS apod (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                explanation TEXT NOT NULL,
                file_path TEXT NOT NULL,
                sha256 TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Find the id of the entry holding an image with this hash
    pub async fn find_by_hash(&self, sha256: &str) -> Result<Option<i64>, FetchError> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT id FROM apod WHERE sha256 = ?")
            .bind(sha256)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.0))
    }

    /// Insert a new entry and return its id.
    ///
    /// Fails with [`FetchError::DuplicateHash`] when the hash is already indexed.
    pub async fn insert(&self, entry: &CreateCacheEntry) -> Result<i64, FetchError> {
        let result = sqlx::query(
            "INSERT INTO apod (title, explanation, file_path, sha256) VALUES (?, ?, ?, ?)",
        )
        .bind(&entry.title)
        .bind(&entry.explanation)
        .bind(&entry.file_path)
        .bind(&entry.sha256)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => {
                let id = done.last_insert_rowid();
                debug!(id, sha256 = %entry.sha256, "Inserted image cache entry");
                Ok(id)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(FetchError::DuplicateHash(entry.sha256.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get an entry by id
    pub async fn get_by_id(&self, id: i64) -> Result<Option<CacheEntry>, FetchError> {
        let row = sqlx::query_as::<_, CacheEntryRow>(
            "SELECT id, title, explanation, file_path, sha256 FROM apod WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_entry))
    }

    /// List all entries, oldest first
    pub async fn list(&self) -> Result<Vec<CacheEntry>, FetchError> {
        let rows = sqlx::query_as::<_, CacheEntryRow>(
            "SELECT id, title, explanation, file_path, sha256 FROM apod ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_entry).collect())
    }

    /// Number of cached images
    pub async fn count(&self) -> Result<i64, FetchError> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM apod")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }
}
