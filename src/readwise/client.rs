use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};

use crate::error::UploadError;

use super::highlight::Highlight;

pub const DEFAULT_READWISE_URL: &str = "https://readwise.io/api/v2";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const RAW_RESPONSE_LIMIT: usize = 500;

#[derive(Debug, Clone)]
pub struct ReadwiseConfig {
    pub base_url: String,
    pub token: String,
    /// Where error logs for rejected uploads are written.
    pub error_log_dir: PathBuf,
    pub timeout_seconds: u64,
}

impl ReadwiseConfig {
    pub fn new(token: &str) -> Self {
        ReadwiseConfig {
            base_url: DEFAULT_READWISE_URL.to_string(),
            token: token.to_string(),
            error_log_dir: PathBuf::from("."),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Serialize)]
struct CreateHighlights<'a> {
    highlights: &'a [Highlight],
}

pub struct ReadwiseClient {
    client: Client,
    config: ReadwiseConfig,
}

impl ReadwiseClient {
    pub fn new(config: ReadwiseConfig) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }

    fn highlights_url(&self) -> String {
        format!("{}/highlights/", self.config.base_url.trim_end_matches('/'))
    }

    /// Uploads the whole batch in one request. Anything but a success status
    /// fails the batch; the response body is saved next to the other reports.
    pub async fn create_highlights(&self, highlights: &[Highlight]) -> Result<(), UploadError> {
        if highlights.is_empty() {
            tracing::info!("no highlights to upload to readwise");
            return Ok(());
        }

        tracing::info!(count = highlights.len(), "pushing highlights to readwise");
        let response = self
            .client
            .post(self.highlights_url())
            .header("Authorization", format!("Token {}", self.config.token))
            .json(&CreateHighlights { highlights })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(count = highlights.len(), "highlights uploaded to readwise");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let error_log = match self.write_error_log(status.as_u16(), &body) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::error!(error = %crate::unpack_error(&e), "failed to write readwise error log");
                None
            }
        };
        let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
        tracing::error!(
            status = status.as_u16(),
            reason = %reason,
            error_log = ?error_log,
            "readwise rejected highlight upload"
        );
        Err(UploadError::Rejected {
            status: status.as_u16(),
            reason,
            error_log,
        })
    }

    fn write_error_log(&self, status: u16, body: &str) -> Result<PathBuf, UploadError> {
        std::fs::create_dir_all(&self.config.error_log_dir)?;
        let path = self.config.error_log_dir.join(format!(
            "error_log_{}_failed_post_request_to_readwise.json",
            status
        ));
        let content = error_log_content(body);
        std::fs::write(&path, serde_json::to_string_pretty(&content)?)?;
        Ok(path)
    }
}

fn error_log_content(body: &str) -> JsonValue {
    if body.trim().is_empty() {
        return json!({"error": "Empty response body"});
    }
    serde_json::from_str(body).unwrap_or_else(|_| {
        json!({
            "error": "Invalid JSON response",
            "raw_response": body.chars().take(RAW_RESPONSE_LIMIT).collect::<String>(),
        })
    })
}
