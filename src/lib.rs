//! apod-desktop - a local, content-addressed cache for the Astronomy Picture of the Day
//!
//! The crate fetches the APOD record for a date, downloads its image (or the
//! video thumbnail), deduplicates it by SHA-256 and keeps exactly one copy of
//! every distinct image on disk, indexed by a small SQLite table.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod platform;
pub mod services;

pub use config::Config;
pub use db::{CacheEntry, Database, NO_ENTRY};
pub use error::FetchError;
