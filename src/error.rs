//! Error types for the fetch pipeline and the image cache

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the fetch pipeline, the image store and the cache index.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network error or non-success response from the APOD service
    #[error("APOD service unavailable: {0}")]
    RemoteUnavailable(String),

    /// Unexpected media type or missing required field in an APOD record
    #[error("malformed APOD record: {0}")]
    MalformedRecord(String),

    #[error("failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("failed to write image file {path:?}: {source}")]
    StorageWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cache index already holds an entry with this content hash
    #[error("an image with SHA-256 {0} is already cached")]
    DuplicateHash(String),

    #[error("no cached APOD with id {0}")]
    NotFound(i64),

    #[error("image cache database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl FetchError {
    /// The pipeline step this failure belongs to.
    pub fn step(&self) -> FetchStep {
        match self {
            FetchError::RemoteUnavailable(_) | FetchError::MalformedRecord(_) => FetchStep::Metadata,
            FetchError::DownloadFailed { .. } => FetchStep::Download,
            FetchError::StorageWriteFailed { .. } => FetchStep::Save,
            FetchError::DuplicateHash(_) | FetchError::Database(_) => FetchStep::Index,
            FetchError::NotFound(_) => FetchStep::Lookup,
        }
    }

    /// Failures that leave nothing behind and are worth retrying by the caller.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::RemoteUnavailable(_) | FetchError::DownloadFailed { .. }
        )
    }
}

/// Named steps of a fetch, used for human-readable status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStep {
    Metadata,
    Download,
    Save,
    Index,
    Lookup,
}

impl fmt::Display for FetchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FetchStep::Metadata => "Getting APOD information",
            FetchStep::Download => "Downloading image",
            FetchStep::Save => "Saving image file",
            FetchStep::Index => "Adding APOD to image cache DB",
            FetchStep::Lookup => "Reading APOD from image cache",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_name_the_failing_stage() {
        assert_eq!(
            FetchError::RemoteUnavailable("status 503".into()).step(),
            FetchStep::Metadata
        );
        assert_eq!(
            FetchError::MalformedRecord("media_type".into()).step(),
            FetchStep::Metadata
        );
        assert_eq!(
            FetchError::DownloadFailed {
                url: "https://x/a.jpg".into(),
                reason: "status 404".into(),
            }
            .step(),
            FetchStep::Download
        );
        assert_eq!(FetchError::NotFound(7).step(), FetchStep::Lookup);
        assert_eq!(FetchStep::Download.to_string(), "Downloading image");
    }

    #[test]
    fn test_transient_errors() {
        assert!(FetchError::RemoteUnavailable("timeout".into()).is_transient());
        assert!(!FetchError::MalformedRecord("bad".into()).is_transient());
        assert!(!FetchError::DuplicateHash("ab".into()).is_transient());
    }
}
