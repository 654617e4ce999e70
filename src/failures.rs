use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::ItemError;

pub const DEFAULT_ZOTERO_FAILURES: &str = "failed_zotero_items.json";
pub const DEFAULT_READWISE_FAILURES: &str = "failed_readwise_items.json";

/// One item that could not be normalized or converted, kept for offline
/// inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub item: JsonValue,
    pub error_type: String,
    pub error_message: String,
}

impl FailureRecord {
    pub fn new<T: Serialize>(item: &T, error: &ItemError) -> Self {
        FailureRecord {
            item: serde_json::to_value(item).unwrap_or(JsonValue::Null),
            error_type: error.error_type().to_string(),
            error_message: crate::unpack_error(error),
        }
    }
}

/// Writes `failures` as pretty JSON to `dir/filename` (or the given default
/// name), creating `dir` first. Returns the written path.
pub fn save_failures(
    failures: &[FailureRecord],
    dir: &Path,
    filename: Option<&str>,
    default_filename: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create failure directory {}", dir.display()))?;
    let path = dir.join(filename.unwrap_or(default_filename));
    let json = serde_json::to_string_pretty(failures)?;
    fs::write(&path, json)
        .with_context(|| format!("failed to write failures to {}", path.display()))?;

    tracing::info!(count = failures.len(), path = %path.display(), "failed items saved");
    Ok(path)
}
