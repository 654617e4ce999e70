use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};

pub const DEFAULT_VERSION_FILE: &str = "since";

/// Library version recorded by the last successful run, or 0 when there is
/// none to read.
pub fn read_library_version(path: &Path) -> i64 {
    match fs::read_to_string(path) {
        Ok(content) => content.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(path = %path.display(), "version file does not hold a number, using library version 0");
            0
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "version file does not exist, using library version 0");
            0
        }
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "failed to read version file, using library version 0");
            0
        }
    }
}

pub fn write_library_version(path: &Path, version: i64) -> Result<()> {
    fs::write(path, version.to_string())
        .with_context(|| format!("failed to write library version to {}", path.display()))
}
