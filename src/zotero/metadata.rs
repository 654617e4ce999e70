use std::collections::HashMap;

use crate::error::SourceError;
use crate::model::{DocumentMetadata, RawRecord};

use super::client::SourceClient;

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Resolves the top-level document behind an annotation or note and caches
/// its metadata.
///
/// Annotations point at an attachment, which in turn points at the document;
/// notes point straight at the document. Both maps live as long as the
/// resolver and are never evicted, so one resolver per run.
pub struct MetadataResolver<'a, C: SourceClient + ?Sized> {
    client: &'a C,
    cache: HashMap<String, DocumentMetadata>,
    parents: HashMap<String, String>,
}

impl<'a, C: SourceClient + ?Sized> MetadataResolver<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            cache: HashMap::new(),
            parents: HashMap::new(),
        }
    }

    pub async fn resolve(&mut self, record: &RawRecord) -> Result<DocumentMetadata, SourceError> {
        let parent_key = record
            .data
            .parent_item
            .as_deref()
            .ok_or_else(|| SourceError::MissingParent(record.key.clone()))?;

        let top_item = match self.parents.get(parent_key) {
            Some(top_key) => {
                if let Some(metadata) = self.cache.get(top_key) {
                    return Ok(metadata.clone());
                }
                let top_key = top_key.clone();
                self.client.item(&top_key).await?
            }
            None => {
                let parent = self.client.item(parent_key).await?;
                match parent.data.parent_item.clone() {
                    Some(grandparent_key) => {
                        self.parents
                            .insert(parent_key.to_string(), grandparent_key.clone());
                        self.client.item(&grandparent_key).await?
                    }
                    None => {
                        self.parents
                            .insert(parent_key.to_string(), parent_key.to_string());
                        parent
                    }
                }
            }
        };

        let top_key = if top_item.data.key.is_empty() {
            top_item.key.clone()
        } else {
            top_item.data.key.clone()
        };
        let metadata = document_metadata(&top_item);
        tracing::debug!(document = %top_key, title = %metadata.title, "document metadata cached");
        self.cache.insert(top_key, metadata.clone());
        Ok(metadata)
    }

    /// Number of distinct documents resolved so far.
    pub fn cached_documents(&self) -> usize {
        self.cache.len()
    }
}

fn document_metadata(top_item: &RawRecord) -> DocumentMetadata {
    let data = &top_item.data;
    let attachment_url = top_item
        .links
        .attachment
        .as_ref()
        .filter(|a| a.attachment_type.as_deref() == Some(PDF_CONTENT_TYPE))
        .map(|a| a.href.clone());

    DocumentMetadata {
        title: data.title.clone().unwrap_or_default(),
        creators: data.creators.iter().map(|c| c.display_name()).collect(),
        tags: data.tag_names().map(str::to_string).collect(),
        document_type: data.item_type.clone(),
        source_url: top_item
            .links
            .alternate
            .as_ref()
            .map(|l| l.href.clone())
            .unwrap_or_default(),
        attachment_url,
    }
}
