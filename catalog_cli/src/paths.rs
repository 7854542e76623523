//! Centralized path management for the catalog CLI

use std::path::PathBuf;

/// Application directory name used across all platforms
const APP_DIR: &str = "catalog";

/// Configuration file path
///
/// `~/.config/catalog/config.toml` on Unix-like systems, the platform config
/// directory elsewhere. Falls back to the current directory when no standard
/// location can be determined.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".catalog"))
        .join("config.toml")
}

/// Data directory holding the persisted session flag
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".catalog"))
}
