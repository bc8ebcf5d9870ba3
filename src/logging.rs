//! Logger setup
//!
//! env_logger writes timestamped, leveled lines to stderr or, when configured,
//! appends them to a log file. `RUST_LOG` always wins over the level from the
//! settings file.

use crate::constants::{APP_DIR_NAME, LOG_FILE_NAME};
use anyhow::{Context, Result};
use env_logger::{Builder, Target};
use log::{warn, LevelFilter};
use std::env;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Default log file location under the platform data directory
pub fn default_log_path() -> Result<PathBuf> {
    let dir = dirs::data_dir().context("Failed to determine data directory")?;
    Ok(dir.join(APP_DIR_NAME).join(LOG_FILE_NAME))
}

/// Install the global logger
///
/// Logs at INFO until [`apply_level`] is called with the configured level.
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let mut builder = Builder::new();
    builder.filter_level(LevelFilter::Trace).parse_default_env();

    let mut open_error = None;
    if let Some(path) = log_file {
        match open_log_file(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => open_error = Some(e),
        }
    }

    builder.try_init().context("Logger already initialized")?;
    apply_level(LevelFilter::Info);

    if let (Some(path), Some(e)) = (log_file, open_error) {
        warn!(
            "Could not open log file {}: {:#}. Logging to stderr.",
            path.display(),
            e
        );
    }
    Ok(())
}

/// Set the maximum level unless `RUST_LOG` chose one
pub fn apply_level(level: LevelFilter) {
    if env::var_os("RUST_LOG").is_none() {
        log::set_max_level(level);
    }
}

/// Open `path` for appending, creating it and its directory as needed
pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}
