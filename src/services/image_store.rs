//! Local image store
//!
//! One directory holding every cached APOD image. File names come from APOD
//! titles. New images are published with a hard link, so a name that is
//! already taken is never overwritten. The store knows nothing about the cache
//! index.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::content_hash::ContentHash;
use crate::error::FetchError;

/// Separator substituted for every non-alphanumeric character of a title
const SEPARATOR: char = '_';

/// Base name used when a title has no usable characters at all
const UNTITLED: &str = "untitled";

/// Where [`ImageStore::save_new`] put an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub path: PathBuf,
    /// `false` when an identical file was already there
    pub created: bool,
}

/// Filesystem directory holding downloaded APOD images
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the store directory if it does not exist yet.
    ///
    /// Returns `true` when the directory was created by this call.
    pub async fn init(&self) -> Result<bool, FetchError> {
        let exists = fs::try_exists(&self.root)
            .await
            .map_err(|e| self.write_error(&self.root, e))?;
        if exists {
            debug!(path = %self.root.display(), "Image cache directory already exists");
            return Ok(false);
        }

        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| self.write_error(&self.root, e))?;
        info!(path = %self.root.display(), "Image cache directory created");
        Ok(true)
    }

    /// Deterministic store path for an image, derived from its title and URL.
    pub fn path_for(&self, title: &str, url: &str) -> PathBuf {
        self.root.join(file_name_for(title, url, None))
    }

    /// Write a newly fetched image without ever replacing an existing file.
    ///
    /// The image lands at [`path_for`](Self::path_for) when that name is free.
    /// Two different images can share a title; if the name is taken by other
    /// bytes, the short content hash is appended to the base name. A file that
    /// already holds exactly these bytes is reused instead of duplicated.
    pub async fn save_new(
        &self,
        data: &[u8],
        title: &str,
        url: &str,
        hash: &ContentHash,
    ) -> Result<SavedImage, FetchError> {
        let path = self.path_for(title, url);
        let temp_path = self.write_temp(data, &path).await?;

        let result = self.publish(&temp_path, path, title, url, hash).await;
        let _ = fs::remove_file(&temp_path).await;
        result
    }

    async fn publish(
        &self,
        temp_path: &Path,
        path: PathBuf,
        title: &str,
        url: &str,
        hash: &ContentHash,
    ) -> Result<SavedImage, FetchError> {
        if let Some(saved) = self.link_or_reuse(temp_path, &path, hash).await? {
            return Ok(saved);
        }

        let suffixed = self
            .root
            .join(file_name_for(title, url, Some(&hash.short_hex())));
        warn!(
            existing = %path.display(),
            path = %suffixed.display(),
            "Image file name already taken, using hash suffix"
        );

        match self.link_or_reuse(temp_path, &suffixed, hash).await? {
            Some(saved) => Ok(saved),
            None => Err(self.write_error(
                &suffixed,
                io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "file name is taken by a different image",
                ),
            )),
        }
    }

    /// Hard-link the temp file to `path`, which fails rather than replace an
    /// existing file. `None` means `path` holds different bytes.
    async fn link_or_reuse(
        &self,
        temp_path: &Path,
        path: &Path,
        hash: &ContentHash,
    ) -> Result<Option<SavedImage>, FetchError> {
        match fs::hard_link(temp_path, path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Image file saved");
                Ok(Some(SavedImage {
                    path: path.to_path_buf(),
                    created: true,
                }))
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let existing = fs::read(path)
                    .await
                    .map_err(|e| self.write_error(path, e))?;
                if ContentHash::compute(&existing) == *hash {
                    debug!(path = %path.display(), "Identical image file already present");
                    Ok(Some(SavedImage {
                        path: path.to_path_buf(),
                        created: false,
                    }))
                } else {
                    Ok(None)
                }
            }
            Err(e) => Err(self.write_error(path, e)),
        }
    }

    /// Write image bytes to `path`, replacing any file already there.
    ///
    /// Bytes land in a temporary sibling first and are renamed into place.
    pub async fn save(&self, data: &[u8], path: &Path) -> Result<(), FetchError> {
        let temp_path = self.write_temp(data, path).await?;

        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(self.write_error(path, e));
        }

        debug!(path = %path.display(), size = data.len(), "Image file saved");
        Ok(())
    }

    /// Remove a file this store wrote but nothing references. Best effort.
    pub async fn discard(&self, path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Discarded unreferenced image file"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to discard image file"),
        }
    }

    /// Write `data` to a hidden temp file next to `target`
    async fn write_temp(&self, data: &[u8], target: &Path) -> Result<PathBuf, FetchError> {
        let temp_path = target.with_file_name(format!(".{}.part", Uuid::new_v4()));

        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(self.write_error(target, e));
        }
        Ok(temp_path)
    }

    fn write_error(&self, path: &Path, source: io::Error) -> FetchError {
        FetchError::StorageWriteFailed {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// File name for an image: sanitized title, optional suffix, URL extension.
fn file_name_for(title: &str, url: &str, suffix: Option<&str>) -> String {
    let mut name = sanitize_title(title);
    if let Some(suffix) = suffix {
        name.push(SEPARATOR);
        name.push_str(suffix);
    }
    if let Some(ext) = url_extension(url) {
        name.push('.');
        name.push_str(&ext);
    }
    name
}

/// Replace every non-alphanumeric character of the trimmed title with `_`.
pub fn sanitize_title(title: &str) -> String {
    let sanitized: String = title
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { SEPARATOR })
        .collect();

    if sanitized.is_empty() {
        UNTITLED.to_string()
    } else {
        sanitized
    }
}

/// Extension of the last path segment of a URL, without the dot.
///
/// Query strings and fragments are ignored. Extensions that are not purely
/// alphanumeric are dropped.
pub fn url_extension(url: &str) -> Option<String> {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    let file_name = path.rsplit('/').next()?;
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_string())
}
