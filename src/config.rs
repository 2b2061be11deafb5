use std::path::PathBuf;

use anyhow::{anyhow, Result};
use directories::BaseDirs;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".academia-maestro";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "maestro.sqlite";
/// Log file name; the dashboard owns the terminal so logs go to disk.
const LOG_FILE_NAME: &str = "academia-maestro.log";

/// Price of an individual lesson when none is given on the command line.
pub const DEFAULT_LESSON_PRICE: f64 = 250.0;

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub lesson_price: f64,
}

impl Config {
    /// Fill in anything not given explicitly from the per-user data
    /// directory.
    pub fn resolve(
        db_path: Option<PathBuf>,
        log_path: Option<PathBuf>,
        lesson_price: Option<f64>,
    ) -> Result<Self> {
        let data_dir = match (&db_path, &log_path) {
            (Some(_), Some(_)) => None,
            _ => Some(data_dir()?),
        };
        let in_data_dir = |file: &str| {
            data_dir
                .as_ref()
                .map(|dir| dir.join(file))
                .ok_or_else(|| anyhow!("could not locate home directory"))
        };

        let db_path = match db_path {
            Some(path) => path,
            None => in_data_dir(DB_FILE_NAME)?,
        };
        let log_path = match log_path {
            Some(path) => path,
            None => in_data_dir(LOG_FILE_NAME)?,
        };

        let lesson_price = lesson_price.unwrap_or(DEFAULT_LESSON_PRICE);
        if !lesson_price.is_finite() || lesson_price < 0.0 {
            return Err(anyhow!("lesson price must be a non-negative amount"));
        }

        Ok(Self {
            db_path,
            log_path,
            lesson_price,
        })
    }
}

/// `~/.academia-maestro`.
fn data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}
