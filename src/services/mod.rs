//! Fetching, storing and reading cached APOD images

pub mod apod;
pub mod content_hash;
pub mod image_store;
pub mod logging;
pub mod pipeline;
pub mod reader;

pub use apod::{ApodClient, ApodProvider, ApodRecord, ImageDownloader, MediaKind};
pub use content_hash::ContentHash;
pub use image_store::{ImageStore, SavedImage};
pub use logging::{LogFormat, init_tracing};
pub use pipeline::{CacheStatus, CachedApod, FetchPipeline, id_or_sentinel};
pub use reader::{ApodInfo, CacheReader};
