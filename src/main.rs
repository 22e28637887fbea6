//! apod-desktop - caches the Astronomy Picture of the Day and sets it as the
//! desktop background.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::Parser;

use apod_desktop::cli::{CliOptions, parse_apod_date};
use apod_desktop::config::Config;
use apod_desktop::db::Database;
use apod_desktop::platform::{BackgroundSetter, SystemBackground};
use apod_desktop::services::{
    ApodClient, CacheReader, CacheStatus, FetchPipeline, ImageStore, init_tracing,
};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let options = CliOptions::parse();

    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(cache_dir) = options.cache_dir.clone() {
        config = config.with_cache_dir(cache_dir);
    }
    init_tracing(config.log_format).context("Failed to initialize logging")?;

    let today = Local::now().date_naive();
    let date = if options.list {
        None
    } else {
        match parse_apod_date(options.date.as_deref(), today) {
            Ok(date) => Some(date),
            Err(e) => {
                eprintln!("Error: {e}");
                eprintln!("Script execution aborted.");
                return Ok(ExitCode::FAILURE);
            }
        }
    };

    // Cache directory and index
    let store = ImageStore::new(config.cache_dir.clone());
    if store.init().await? {
        println!("Image cache directory created at {}.", store.root().display());
    } else {
        println!("Image cache directory already exists.");
    }

    let database_path = config.database_path();
    let db = Database::connect(&database_path, config.max_connections)
        .await
        .with_context(|| format!("Failed to open image cache DB at {}", database_path.display()))?;
    db.initialize().await?;
    println!("Image cache DB ready at {}.", database_path.display());

    let reader = CacheReader::new(db.clone());

    let Some(date) = date else {
        let entries = reader.list().await?;
        for entry in &entries {
            println!("{:>5}  {}  {}", entry.id, entry.short_sha256(), entry.title);
        }
        println!("{} cached APOD image(s).", entries.len());
        db.close().await;
        return Ok(ExitCode::SUCCESS);
    };
    println!("APOD date: {date}");

    let client = Arc::new(
        ApodClient::new(&config.api_url, &config.api_key, config.http_timeout)
            .context("Failed to create APOD client")?,
    );
    let pipeline = FetchPipeline::new(client.clone(), client, store, db.clone());

    let cached = match pipeline.add_apod_to_cache(date).await {
        Ok(cached) => cached,
        Err(e) => {
            println!("{}...failed: {e}", e.step());
            println!("Failed to retrieve APOD information.");
            if e.is_transient() {
                println!("Nothing was cached; running again later may succeed.");
            }
            db.close().await;
            return Ok(ExitCode::FAILURE);
        }
    };

    match cached.status {
        CacheStatus::Added => println!("APOD image added to cache (id {}).", cached.id),
        CacheStatus::Existing => println!("APOD image is already in cache (id {}).", cached.id),
    }
    println!("APOD SHA-256: {}", cached.sha256);

    let info = match reader.get_apod_info(cached.id).await {
        Ok(info) => info,
        Err(e) => {
            println!("{}...failed: {e}", e.step());
            println!("Failed to retrieve APOD information.");
            db.close().await;
            return Ok(ExitCode::FAILURE);
        }
    };
    println!("APOD title: {}", info.title);
    println!("APOD file path: {}", info.file_path.display());
    db.close().await;

    if options.no_background {
        return Ok(ExitCode::SUCCESS);
    }

    match SystemBackground.set_desktop_background(&info.file_path).await {
        Ok(()) => {
            println!("Setting desktop background to APOD from {date}...success");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("Setting desktop background to APOD from {date}...failed: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
