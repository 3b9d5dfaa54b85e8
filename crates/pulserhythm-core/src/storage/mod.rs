pub mod config;
pub mod database;

pub use config::Config;
pub use database::{Database, HistoryStats, SessionRecord};

use std::path::PathBuf;

use crate::error::CoreError;

/// Returns `~/.config/pulserhythm[-dev]/` based on PULSERHYTHM_ENV.
///
/// Set PULSERHYTHM_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, CoreError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("PULSERHYTHM_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("pulserhythm-dev")
    } else {
        base_dir.join("pulserhythm")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
