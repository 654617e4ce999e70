use anyhow::Result;
use serde::Serialize;

use crate::config::Settings;
use crate::failures::{DEFAULT_READWISE_FAILURES, DEFAULT_ZOTERO_FAILURES, FailureRecord, save_failures};
use crate::model::RawRecord;
use crate::readwise::{HighlightConverter, ReadwiseClient};
use crate::version::{read_library_version, write_library_version};
use crate::zotero::{Normalizer, ZoteroClient};

#[derive(Debug, Default, Serialize)]
pub struct SyncStats {
    pub retrieved: usize,
    pub normalized: usize,
    pub normalize_failed: usize,
    pub converted: usize,
    pub convert_failed: usize,
    pub uploaded: usize,
}

/// One Zotero → Readwise run: retrieve, normalize, convert, upload.
pub struct Synchronizer {
    settings: Settings,
    zotero: ZoteroClient,
    readwise: ReadwiseClient,
}

impl Synchronizer {
    pub fn new(settings: Settings) -> Result<Self> {
        let zotero = ZoteroClient::new(settings.zotero.clone())?;
        let readwise = ReadwiseClient::new(settings.readwise.clone())?;
        Ok(Self {
            settings,
            zotero,
            readwise,
        })
    }

    /// Annotations and/or notes, as configured, changed since the stored
    /// library version when `use_since` is on.
    pub async fn retrieve(&self) -> Result<Vec<RawRecord>> {
        let since = if self.settings.use_since {
            read_library_version(&self.settings.version_file)
        } else {
            0
        };

        let mut records = Vec::new();
        if self.settings.include_annotations {
            records.extend(self.zotero.items("annotation", since).await?);
        }
        if self.settings.include_notes {
            records.extend(self.zotero.items("note", since).await?);
        }
        tracing::info!(count = records.len(), "zotero items retrieved");
        Ok(records)
    }

    pub async fn run(&self) -> Result<SyncStats> {
        let records = self.retrieve().await?;
        self.run_with(&records).await
    }

    /// Runs the pipeline over records already in hand. Per-item failures are
    /// reported and skipped; a rejected upload ends the run with an error.
    pub async fn run_with(&self, records: &[RawRecord]) -> Result<SyncStats> {
        let mut stats = SyncStats {
            retrieved: records.len(),
            ..Default::default()
        };

        let mut normalizer = Normalizer::new(&self.zotero);
        let normalized = normalizer
            .normalize_batch(records, &self.settings.filter)
            .await;
        stats.normalized = normalized.items.len();
        stats.normalize_failed = normalized.failures.len();
        self.report_failures(&normalized.failures, DEFAULT_ZOTERO_FAILURES);

        let converter = HighlightConverter::new(self.settings.custom_tag.clone());
        let converted = converter.convert_batch(&normalized.items);
        stats.converted = converted.highlights.len();
        stats.convert_failed = converted.failures.len();
        self.report_failures(&converted.failures, DEFAULT_READWISE_FAILURES);

        self.readwise.create_highlights(&converted.highlights).await?;
        stats.uploaded = converted.highlights.len();

        if self.settings.use_since {
            let version = self.zotero.last_modified_version().await?;
            write_library_version(&self.settings.version_file, version)?;
            tracing::info!(version, "library version saved");
        }

        tracing::info!(
            retrieved = stats.retrieved,
            normalized = stats.normalized,
            normalize_failed = stats.normalize_failed,
            converted = stats.converted,
            convert_failed = stats.convert_failed,
            uploaded = stats.uploaded,
            "sync finished"
        );
        Ok(stats)
    }

    fn report_failures(&self, failures: &[FailureRecord], filename: &str) {
        if failures.is_empty() || !self.settings.write_failures {
            return;
        }
        if let Err(e) = save_failures(failures, &self.settings.output_dir, None, filename) {
            log_report_error(filename, e);
        }
    }
}

fn log_report_error(filename: &str, e: impl std::fmt::Display) {
    tracing::error!("Failed to write failure report {}: {}", filename, e);
}
