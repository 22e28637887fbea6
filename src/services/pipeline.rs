//! Fetch pipeline: APOD record → image bytes → hash → dedup → store + index
//!
//! Steps run strictly in order and every failure goes back to the caller;
//! nothing is retried here. Files and rows are only written once the hash is
//! known to be new, so a failed fetch leaves no state behind. The one tolerated
//! exception is an image file whose index insert failed after the save.

use std::io;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::apod::{ApodProvider, ImageDownloader};
use super::content_hash::ContentHash;
use super::image_store::ImageStore;
use crate::db::{CreateCacheEntry, Database, NO_ENTRY};
use crate::error::FetchError;

/// Whether a fetch created a new cache entry or found an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Added,
    Existing,
}

/// Result of a successful fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedApod {
    pub id: i64,
    pub status: CacheStatus,
    pub sha256: ContentHash,
}

/// Id of a fetch result, or [`NO_ENTRY`] when the fetch failed
pub fn id_or_sentinel(result: &Result<CachedApod, FetchError>) -> i64 {
    result.as_ref().map(|cached| cached.id).unwrap_or(NO_ENTRY)
}

/// Orchestrates adding a day's APOD image to the cache
pub struct FetchPipeline {
    provider: Arc<dyn ApodProvider>,
    downloader: Arc<dyn ImageDownloader>,
    store: ImageStore,
    db: Database,
}

impl FetchPipeline {
    pub fn new(
        provider: Arc<dyn ApodProvider>,
        downloader: Arc<dyn ImageDownloader>,
        store: ImageStore,
        db: Database,
    ) -> Self {
        Self {
            provider,
            downloader,
            store,
            db,
        }
    }

    /// Add the APOD image for `date` to the cache, reusing an existing entry
    /// when the same image bytes are already cached.
    pub async fn add_apod_to_cache(&self, date: NaiveDate) -> Result<CachedApod, FetchError> {
        let record = self.provider.get_apod_info(date).await?;
        info!(date = %date, title = %record.title, media = %record.media_kind, "Got APOD information");

        let image_url = record.image_url()?.to_string();
        let data = self.downloader.download_image(&image_url).await?;

        let sha256 = ContentHash::compute(&data);
        let hex = sha256.to_hex();
        debug!(sha256 = %hex, size = data.len(), "Hashed image");

        let cache = self.db.apod_cache();
        if let Some(id) = cache.find_by_hash(&hex).await? {
            info!(id, sha256 = %hex, "APOD image is already in cache");
            return Ok(CachedApod {
                id,
                status: CacheStatus::Existing,
                sha256,
            });
        }

        // Titles sanitize to alphanumerics, so only the store root can be non-UTF-8
        let planned = self.store.path_for(&record.title, &image_url);
        if planned.to_str().is_none() {
            return Err(FetchError::StorageWriteFailed {
                path: planned,
                source: io::Error::new(io::ErrorKind::InvalidInput, "path is not valid UTF-8"),
            });
        }

        let saved = self
            .store
            .save_new(&data, &record.title, &image_url, &sha256)
            .await?;

        let entry = CreateCacheEntry {
            title: record.title,
            explanation: record.explanation,
            file_path: saved.path.to_string_lossy().into_owned(),
            sha256: hex.clone(),
        };

        match cache.insert(&entry).await {
            Ok(id) => {
                info!(id, path = %entry.file_path, "APOD image added to cache");
                Ok(CachedApod {
                    id,
                    status: CacheStatus::Added,
                    sha256,
                })
            }
            Err(FetchError::DuplicateHash(_)) => {
                // Another fetch indexed the same image first
                warn!(sha256 = %hex, path = %entry.file_path, "Lost insert race, reusing existing entry");
                let Some(winner) = cache.find_by_hash(&hex).await? else {
                    return Err(FetchError::DuplicateHash(hex));
                };

                if saved.created {
                    let winner_path = cache.get_by_id(winner).await?.map(|e| e.file_path);
                    if winner_path.as_deref() != Some(entry.file_path.as_str()) {
                        self.store.discard(&saved.path).await;
                    }
                }

                Ok(CachedApod {
                    id: winner,
                    status: CacheStatus::Existing,
                    sha256,
                })
            }
            Err(e) => {
                warn!(error = %e, path = %entry.file_path, "Image saved but not indexed");
                Err(e)
            }
        }
    }
}
