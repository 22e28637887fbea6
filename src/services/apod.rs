//! NASA APOD (Astronomy Picture of the Day) API client
//!
//! Base URL: https://api.nasa.gov/planetary/apod
//!
//! One request per date. `thumbs=true` makes the API include a thumbnail URL
//! for video entries, which is what gets cached for them.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::FetchError;

pub const DEFAULT_API_URL: &str = "https://api.nasa.gov/planetary/apod";

/// The APOD archive starts on this date
pub fn first_apod_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1995, 6, 16).unwrap_or(NaiveDate::MIN)
}

/// Kind of media an APOD entry points to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw APOD payload as returned by the API. Fields this crate does not cache
/// (`date`, `url`, `copyright`, ...) are ignored.
#[derive(Debug, Deserialize)]
pub struct ApodResponse {
    pub title: Option<String>,
    pub explanation: Option<String>,
    pub media_type: Option<String>,
    pub hdurl: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// A validated APOD record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApodRecord {
    pub title: String,
    pub explanation: String,
    pub media_kind: MediaKind,
    pub hdurl: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl TryFrom<ApodResponse> for ApodRecord {
    type Error = FetchError;

    fn try_from(raw: ApodResponse) -> Result<Self, Self::Error> {
        let media_type = raw
            .media_type
            .ok_or_else(|| FetchError::MalformedRecord("missing media_type".to_string()))?;
        let media_kind = MediaKind::parse(&media_type).ok_or_else(|| {
            FetchError::MalformedRecord(format!(
                "media type {media_type:?} is neither image nor video"
            ))
        })?;
        let title = raw
            .title
            .ok_or_else(|| FetchError::MalformedRecord("missing title".to_string()))?;
        let explanation = raw
            .explanation
            .ok_or_else(|| FetchError::MalformedRecord("missing explanation".to_string()))?;

        Ok(Self {
            title,
            explanation,
            media_kind,
            hdurl: raw.hdurl,
            thumbnail_url: raw.thumbnail_url,
        })
    }
}

impl ApodRecord {
    /// URL of the image to cache: the HD image for images, the thumbnail for videos.
    pub fn image_url(&self) -> Result<&str, FetchError> {
        let (url, field) = match self.media_kind {
            MediaKind::Image => (self.hdurl.as_deref(), "hdurl"),
            MediaKind::Video => (self.thumbnail_url.as_deref(), "thumbnail_url"),
        };
        url.filter(|u| !u.trim().is_empty()).ok_or_else(|| {
            FetchError::MalformedRecord(format!(
                "{} record {:?} has no {}",
                self.media_kind, self.title, field
            ))
        })
    }
}

/// Source of APOD records
#[async_trait]
pub trait ApodProvider: Send + Sync {
    /// Get the APOD record for a date
    async fn get_apod_info(&self, date: NaiveDate) -> Result<ApodRecord, FetchError>;
}

/// Fetches raw image bytes
#[async_trait]
pub trait ImageDownloader: Send + Sync {
    /// Download an image. Does not save it anywhere.
    async fn download_image(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// HTTP client for the APOD API and the images it references
pub struct ApodClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ApodClient {
    /// Create a client whose requests give up after `timeout`
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("apod-desktop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                FetchError::RemoteUnavailable(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl ApodProvider for ApodClient {
    async fn get_apod_info(&self, date: NaiveDate) -> Result<ApodRecord, FetchError> {
        let date_param = date.format("%Y-%m-%d").to_string();
        info!(date = %date_param, "Getting APOD information");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("date", date_param.as_str()),
                ("thumbs", "true"),
            ])
            .send()
            .await
            .map_err(|e| FetchError::RemoteUnavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!(date = %date_param, status = %status, "APOD request failed");
            return Err(FetchError::RemoteUnavailable(format!(
                "APOD request failed with status: {status}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::RemoteUnavailable(format!("failed to read response: {e}")))?;
        let raw: ApodResponse = serde_json::from_slice(&body)
            .map_err(|e| FetchError::MalformedRecord(format!("failed to parse APOD response: {e}")))?;

        let record = ApodRecord::try_from(raw)?;
        debug!(title = %record.title, media = %record.media_kind, "APOD record parsed");
        Ok(record)
    }
}

#[async_trait]
impl ImageDownloader for ApodClient {
    async fn download_image(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        info!(url = %url, "Downloading image");

        let download_failed = |reason: String| FetchError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| download_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_failed(format!("status {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_failed(format!("failed to read image bytes: {e}")))?;

        debug!(url = %url, size = bytes.len(), "Image downloaded");
        Ok(bytes.to_vec())
    }
}
