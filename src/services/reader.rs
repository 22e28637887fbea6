//! Read-only access to cached APODs by id

use std::path::PathBuf;

use crate::db::{CacheEntry, Database, NO_ENTRY};
use crate::error::FetchError;

/// Display metadata for a cached APOD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApodInfo {
    pub title: String,
    pub explanation: String,
    pub file_path: PathBuf,
}

impl From<CacheEntry> for ApodInfo {
    fn from(entry: CacheEntry) -> Self {
        Self {
            title: entry.title,
            explanation: entry.explanation,
            file_path: PathBuf::from(entry.file_path),
        }
    }
}

/// Resolves cache ids to display metadata
#[derive(Clone)]
pub struct CacheReader {
    db: Database,
}

impl CacheReader {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Look up a cached APOD. The sentinel id and unknown ids are [`FetchError::NotFound`].
    pub async fn get_apod_info(&self, id: i64) -> Result<ApodInfo, FetchError> {
        if id == NO_ENTRY {
            return Err(FetchError::NotFound(id));
        }

        self.db
            .apod_cache()
            .get_by_id(id)
            .await?
            .map(ApodInfo::from)
            .ok_or(FetchError::NotFound(id))
    }

    /// Every cached APOD, oldest first
    pub async fn list(&self) -> Result<Vec<CacheEntry>, FetchError> {
        self.db.apod_cache().list().await
    }
}
