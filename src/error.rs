use std::path::PathBuf;

use thiserror::Error;

/// Failures talking to the reference-manager (Zotero) web API.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HttpError")]
    Http(#[from] reqwest::Error),
    #[error("StatusError: {resource} returned {status}")]
    Status { status: u16, resource: String },
    #[error("DecodeError")]
    Decode(#[from] serde_json::Error),
    #[error("MissingParent: item {0} has no parentItem")]
    MissingParent(String),
    #[error("InvalidItemType: '{0}' (item type must be either 'annotation' or 'note')")]
    InvalidItemType(String),
}

/// Per-item failures raised while normalizing a source record or converting
/// it into a destination highlight. None of these abort a batch.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("{} annotations are not currently supported", annotation_label(.0))]
    UnsupportedAnnotation(String),
    #[error("item type '{0}' is not supported; only 'note' and 'annotation' items are")]
    UnsupportedItemType(String),
    #[error("no annotation or note text found")]
    EmptyBody,
    #[error("failed to resolve parent document")]
    Resolution(#[from] SourceError),
    #[error("highlight exceeds {limit} character limit ({length} chars)")]
    LengthExceeded { length: usize, limit: usize },
    #[error("invalid annotated-at timestamp '{value}'")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

fn annotation_label(kind: &str) -> String {
    match kind {
        "ink" => "Handwritten (ink)".to_string(),
        "image" => "Image/area".to_string(),
        other => format!("'{}'", other),
    }
}

impl ItemError {
    /// Stable category recorded in failure exports.
    pub fn error_type(&self) -> &'static str {
        match self {
            ItemError::UnsupportedAnnotation(_) | ItemError::UnsupportedItemType(_) => {
                "unsupported-kind"
            }
            ItemError::EmptyBody => "validation",
            ItemError::Resolution(_) => "resolution",
            ItemError::LengthExceeded { .. } => "length-exceeded",
            ItemError::InvalidTimestamp { .. } => "conversion",
        }
    }

    pub fn is_unsupported(&self) -> bool {
        self.error_type() == "unsupported-kind"
    }
}

fn error_log_note(error_log: &Option<PathBuf>) -> String {
    match error_log {
        Some(path) => format!("error log is saved to {}", path.display()),
        None => "error log could not be written".to_string(),
    }
}

/// A batched upload that the destination refused or never reached.
/// Fatal for the run.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(
        "Uploading to Readwise failed: POST request status code={status} ({reason}); {}",
        error_log_note(.error_log)
    )]
    Rejected {
        status: u16,
        reason: String,
        error_log: Option<PathBuf>,
    },
    #[error("HttpError")]
    Http(#[from] reqwest::Error),
    #[error("IoError")]
    Io(#[from] std::io::Error),
    #[error("EncodeError")]
    Encode(#[from] serde_json::Error),
}
