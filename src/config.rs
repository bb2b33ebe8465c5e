//! Configuration and data directory management.
//!
//! The engine persists its state in the platform-standard data directory:
//! - Linux: `~/.local/share/encore/`
//! - macOS: `~/Library/Application Support/encore/`
//! - Windows: `%APPDATA%\encore\`
//!
//! The directory is created on first use. Tests and the `--db-path` flag can
//! point the store anywhere else.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Returns the platform-appropriate database file path, creating the
/// `encore` data subdirectory when it does not exist yet.
///
/// # Errors
///
/// Fails when the system data directory cannot be determined or the
/// subdirectory cannot be created.
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("catalog.db"))
}

/// Returns the `encore` data directory itself, creating it on demand.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().context("could not determine the system data directory")?;

    let encore_dir = data_dir.join("encore");
    fs::create_dir_all(&encore_dir).with_context(|| {
        format!(
            "failed to create data directory at {}",
            encore_dir.display()
        )
    })?;

    Ok(encore_dir)
}

/// Configuration for runtime behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Path to the database file.
    pub db_path: PathBuf,
}

impl RuntimeConfig {
    /// Resolves the default database location.
    pub fn new() -> Result<Self> {
        Ok(Self {
            db_path: get_db_path()?,
        })
    }

    /// Uses an explicit database path instead of the platform default.
    #[must_use]
    pub fn with_db_path(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    /// Applies an optional override on top of the platform default.
    pub fn resolve(db_path: Option<PathBuf>) -> Result<Self> {
        match db_path {
            Some(path) => Ok(Self::with_db_path(path)),
            None => Self::new(),
        }
    }
}
