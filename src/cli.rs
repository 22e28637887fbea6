//! Command-line options and APOD date validation.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use thiserror::Error;

use crate::services::apod::first_apod_date;

/// Date format accepted on the command line
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Cache the Astronomy Picture of the Day and set it as the desktop background
#[derive(Debug, Parser)]
#[command(name = "apod-desktop", version)]
pub struct CliOptions {
    /// APOD date (YYYY-MM-DD); defaults to today
    pub date: Option<String>,

    /// Only cache the image, leave the desktop background alone
    #[arg(long)]
    pub no_background: bool,

    /// List cached APODs and exit
    #[arg(long)]
    pub list: bool,

    /// Image cache directory (overrides APOD_CACHE_DIR)
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("invalid APOD date {0:?}, expected YYYY-MM-DD")]
    Invalid(String),

    #[error("APOD date cannot be in the future")]
    Future(NaiveDate),

    #[error("APOD date cannot be before {first}")]
    BeforeFirst { date: NaiveDate, first: NaiveDate },
}

/// Resolve the requested APOD date, defaulting to `today`.
pub fn parse_apod_date(arg: Option<&str>, today: NaiveDate) -> Result<NaiveDate, DateError> {
    let date = match arg {
        Some(value) => NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
            .map_err(|_| DateError::Invalid(value.to_string()))?,
        None => today,
    };

    if date > today {
        return Err(DateError::Future(date));
    }

    let first = first_apod_date();
    if date < first {
        return Err(DateError::BeforeFirst { date, first });
    }

    Ok(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_defaults_to_today() {
        assert_eq!(parse_apod_date(None, today()), Ok(today()));
    }

    #[test]
    fn test_parses_iso_date() {
        assert_eq!(
            parse_apod_date(Some("2023-12-25"), today()),
            Ok(NaiveDate::from_ymd_opt(2023, 12, 25).unwrap())
        );
        assert_eq!(parse_apod_date(Some("2024-06-01"), today()), Ok(today()));
    }

    #[test]
    fn test_rejects_bad_dates() {
        assert_eq!(
            parse_apod_date(Some("12/25/2023"), today()),
            Err(DateError::Invalid("12/25/2023".to_string()))
        );
        assert_eq!(
            parse_apod_date(Some("2023-02-30"), today()),
            Err(DateError::Invalid("2023-02-30".to_string()))
        );
        assert!(matches!(
            parse_apod_date(Some("2024-06-02"), today()),
            Err(DateError::Future(_))
        ));
        assert!(matches!(
            parse_apod_date(Some("1995-06-15"), today()),
            Err(DateError::BeforeFirst { .. })
        ));
        assert!(parse_apod_date(Some("1995-06-16"), today()).is_ok());
    }

    #[test]
    fn test_cli_parsing() {
        let options =
            CliOptions::try_parse_from(["apod-desktop", "2024-01-01", "--no-background"]).unwrap();
        assert_eq!(options.date.as_deref(), Some("2024-01-01"));
        assert!(options.no_background);
        assert!(!options.list);

        let options =
            CliOptions::try_parse_from(["apod-desktop", "--list", "--cache-dir", "/tmp/x"]).unwrap();
        assert!(options.list);
        assert_eq!(options.cache_dir, Some(PathBuf::from("/tmp/x")));
    }
}
