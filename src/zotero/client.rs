use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;

use crate::error::SourceError;
use crate::model::RawRecord;

pub const DEFAULT_ZOTERO_URL: &str = "https://api.zotero.org";
const API_VERSION: &str = "3";
const PAGE_SIZE: usize = 100;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Single-record lookup against the source library. The metadata resolver
/// only ever needs this.
#[async_trait]
pub trait SourceClient: Send + Sync {
    async fn item(&self, key: &str) -> Result<RawRecord, SourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LibraryType {
    #[default]
    User,
    Group,
}

impl LibraryType {
    fn path_segment(&self) -> &'static str {
        match self {
            LibraryType::User => "users",
            LibraryType::Group => "groups",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ZoteroConfig {
    pub base_url: String,
    pub api_key: String,
    pub library_id: String,
    pub library_type: LibraryType,
    pub timeout_seconds: u64,
}

impl ZoteroConfig {
    pub fn new(api_key: &str, library_id: &str, library_type: LibraryType) -> Self {
        ZoteroConfig {
            base_url: DEFAULT_ZOTERO_URL.to_string(),
            api_key: api_key.to_string(),
            library_id: library_id.to_string(),
            library_type,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }
}

pub struct ZoteroClient {
    client: Client,
    config: ZoteroConfig,
}

impl ZoteroClient {
    pub fn new(config: ZoteroConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        tracing::info!(
            library_id = %config.library_id,
            library_type = ?config.library_type,
            "zotero client ready"
        );

        Ok(Self { client, config })
    }

    fn library_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.library_type.path_segment(),
            urlencoding::encode(&self.config.library_id)
        )
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.client
            .get(url)
            .header("Zotero-API-Key", &self.config.api_key)
            .header("Zotero-API-Version", API_VERSION)
    }

    async fn send(&self, request: RequestBuilder, resource: &str) -> Result<Response, SourceError> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status {
                status: response.status().as_u16(),
                resource: resource.to_string(),
            });
        }
        Ok(response)
    }

    /// Every record of `item_type` ("annotation" or "note") modified after
    /// library version `since`, following the API's pagination to the end.
    pub async fn items(&self, item_type: &str, since: i64) -> Result<Vec<RawRecord>, SourceError> {
        if item_type != "annotation" && item_type != "note" {
            return Err(SourceError::InvalidItemType(item_type.to_string()));
        }

        if since == 0 {
            tracing::info!("retrieving all {}s from zotero", item_type);
        } else {
            tracing::info!(since, "retrieving {}s modified since last run", item_type);
        }

        let url = format!("{}/items", self.library_url());
        let mut records = Vec::new();
        loop {
            let request = self.get(&url).query(&[
                ("itemType", item_type.to_string()),
                ("since", since.to_string()),
                ("format", "json".to_string()),
                ("limit", PAGE_SIZE.to_string()),
                ("start", records.len().to_string()),
            ]);
            let response = self.send(request, "items").await?;
            let total = header_number(&response, "Total-Results");
            let body = response.text().await?;
            let page: Vec<RawRecord> = serde_json::from_str(&body)?;
            let page_len = page.len();
            records.extend(page);

            tracing::debug!(fetched = records.len(), total = ?total, "zotero page read");
            match total {
                Some(total) if (records.len() as i64) < total && page_len > 0 => continue,
                None if page_len == PAGE_SIZE => continue,
                _ => break,
            }
        }

        Ok(records)
    }

    /// The library's current version, stored as the marker for `--use-since`.
    pub async fn last_modified_version(&self) -> Result<i64, SourceError> {
        let url = format!("{}/items", self.library_url());
        let request = self.get(&url).query(&[("limit", "1"), ("format", "keys")]);
        let response = self.send(request, "items").await?;
        Ok(header_number(&response, "Last-Modified-Version").unwrap_or(0))
    }
}

fn header_number(response: &Response, name: &str) -> Option<i64> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

#[async_trait]
impl SourceClient for ZoteroClient {
    async fn item(&self, key: &str) -> Result<RawRecord, SourceError> {
        let resource = format!("items/{}", key);
        let url = format!("{}/items/{}", self.library_url(), urlencoding::encode(key));
        let request = self.get(&url).query(&[("format", "json")]);
        let response = self.send(request, &resource).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
