use std::collections::HashSet;

use crate::error::ItemError;
use crate::failures::FailureRecord;
use crate::model::{ItemType, NormalizedItem, RawRecord};

use super::client::SourceClient;
use super::metadata::MetadataResolver;

const MAX_AUTHORS_LENGTH: usize = 1024;
const MAX_AUTHOR_LENGTH: usize = 256;
const AUTHOR_SEP: &str = ", ";
const ET_AL: &str = " et al.";

/// User-selected inclusion rules. Empty sets mean "no constraint".
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub colors: Vec<String>,
    pub tags: Vec<String>,
    /// Keep the filter tags on the items they selected.
    pub include_filter_tags: bool,
}

impl ItemFilter {
    pub fn matches(&self, record: &RawRecord) -> bool {
        let color_ok = self.colors.is_empty()
            || record
                .data
                .annotation_color
                .as_ref()
                .is_some_and(|c| self.colors.contains(c));
        let tag_ok = self.tags.is_empty()
            || record
                .data
                .tag_names()
                .any(|t| self.tags.iter().any(|f| f == t));
        color_ok && tag_ok
    }

    fn compose_tags<'t>(&self, tags: impl Iterator<Item = &'t str>) -> Vec<String> {
        if self.include_filter_tags {
            return tags.map(str::to_string).collect();
        }
        let excluded: HashSet<&str> = self.tags.iter().map(String::as_str).collect();
        tags.filter(|t| !excluded.contains(t))
            .map(str::to_string)
            .collect()
    }
}

/// The (itemType, annotationType) combinations a record can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    Highlight,
    MarginNote,
    Note,
    Ink,
    Image,
    UnknownAnnotation(String),
    Unknown(String),
}

impl ItemKind {
    pub fn classify(item_type: &str, annotation_type: Option<&str>) -> Self {
        match (item_type, annotation_type) {
            ("annotation", Some("highlight")) => ItemKind::Highlight,
            ("annotation", Some("note")) => ItemKind::MarginNote,
            ("annotation", Some("ink")) => ItemKind::Ink,
            ("annotation", Some("image")) => ItemKind::Image,
            ("annotation", other) => {
                ItemKind::UnknownAnnotation(other.unwrap_or_default().to_string())
            }
            ("note", _) => ItemKind::Note,
            (other, _) => ItemKind::Unknown(other.to_string()),
        }
    }

    /// Body text and comment for supported kinds.
    fn content(&self, record: &RawRecord) -> Result<(ItemType, String, String), ItemError> {
        let data = &record.data;
        match self {
            ItemKind::Highlight => Ok((
                ItemType::Annotation,
                data.annotation_text.clone().unwrap_or_default(),
                data.annotation_comment.clone().unwrap_or_default(),
            )),
            ItemKind::MarginNote => Ok((
                ItemType::Annotation,
                data.annotation_comment.clone().unwrap_or_default(),
                String::new(),
            )),
            ItemKind::Note => Ok((
                ItemType::Note,
                data.note.clone().unwrap_or_default(),
                String::new(),
            )),
            ItemKind::Ink => Err(ItemError::UnsupportedAnnotation("ink".into())),
            ItemKind::Image => Err(ItemError::UnsupportedAnnotation("image".into())),
            ItemKind::UnknownAnnotation(t) => Err(ItemError::UnsupportedAnnotation(t.clone())),
            ItemKind::Unknown(t) => Err(ItemError::UnsupportedItemType(t.clone())),
        }
    }
}

#[derive(Debug, Default)]
pub struct NormalizeOutcome {
    pub items: Vec<NormalizedItem>,
    pub failures: Vec<FailureRecord>,
}

/// Turns raw Zotero records into [`NormalizedItem`]s.
///
/// Owns the metadata cache for its lifetime: build a new normalizer to start
/// from an empty cache.
pub struct Normalizer<'a, C: SourceClient + ?Sized> {
    resolver: MetadataResolver<'a, C>,
}

impl<'a, C: SourceClient + ?Sized> Normalizer<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            resolver: MetadataResolver::new(client),
        }
    }

    /// Normalizes every record the filter accepts. A failing record is
    /// recorded and skipped; the rest of the batch carries on. Items come back
    /// sorted by (title, sort index).
    pub async fn normalize_batch(
        &mut self,
        records: &[RawRecord],
        filter: &ItemFilter,
    ) -> NormalizeOutcome {
        tracing::info!(count = records.len(), "start formatting zotero annotations/notes");

        let mut outcome = NormalizeOutcome::default();
        for record in records.iter().filter(|r| filter.matches(r)) {
            match self.normalize(record, filter).await {
                Ok(item) => outcome.items.push(item),
                Err(e) => {
                    let failure = FailureRecord::new(record, &e);
                    if e.is_unsupported() {
                        tracing::info!(
                            key = %record.key,
                            "skipping item: {}",
                            failure.error_message
                        );
                    } else {
                        tracing::warn!(
                            key = %record.key,
                            error_type = %failure.error_type,
                            "failed to format item: {}",
                            failure.error_message
                        );
                    }
                    outcome.failures.push(failure);
                }
            }
        }

        outcome.items.sort_by(|a, b| {
            let a_key = (a.title.as_deref().unwrap_or(""), a.sort_index.as_deref().unwrap_or(""));
            let b_key = (b.title.as_deref().unwrap_or(""), b.sort_index.as_deref().unwrap_or(""));
            a_key.cmp(&b_key)
        });

        if outcome.failures.is_empty() {
            tracing::info!(formatted = outcome.items.len(), "formatting zotero items completed");
        } else {
            tracing::warn!(
                formatted = outcome.items.len(),
                failed = outcome.failures.len(),
                total = records.len(),
                "formatting zotero items completed with failures"
            );
        }
        outcome
    }

    pub async fn normalize(
        &mut self,
        record: &RawRecord,
        filter: &ItemFilter,
    ) -> Result<NormalizedItem, ItemError> {
        let data = &record.data;
        let kind = ItemKind::classify(&data.item_type, data.annotation_type.as_deref());
        let (item_type, text, comment) = kind.content(record)?;
        if text.is_empty() {
            return Err(ItemError::EmptyBody);
        }

        let metadata = self.resolver.resolve(record).await?;

        let key = if data.key.is_empty() { &record.key } else { &data.key };
        let version = if data.version == 0 { record.version } else { data.version };
        let annotation_url = record
            .links
            .alternate
            .as_ref()
            .map(|l| l.href.as_str())
            .unwrap_or_default();

        let mut item = NormalizedItem::new(
            key,
            version,
            item_type,
            text,
            &data.date_modified,
            annotation_url,
        );
        item.comment = comment;
        item.attachment_url = metadata.attachment_url;
        item.title = Some(metadata.title).filter(|t| !t.is_empty());
        item.tags = filter.compose_tags(data.tag_names());
        item.document_tags = metadata.tags;
        item.document_type = metadata.document_type;
        item.annotation_type = data.annotation_type.clone();
        item.creators = format_author_list(&metadata.creators);
        item.source_url = metadata.source_url;
        item.page_label = data.annotation_page_label.clone();
        item.color = data.annotation_color.clone();
        item.relations = data.related_items();
        item.sort_index = data.annotation_sort_index.clone();
        Ok(item)
    }
}

/// Joins author names with ", ", dropping names from the end and appending
/// " et al." once the result would exceed 1024 characters. Each name is first
/// cut to 256 characters, so at least one always fits.
pub fn format_author_list(authors: &[String]) -> String {
    let mut names: Vec<String> = authors
        .iter()
        .map(|a| a.chars().take(MAX_AUTHOR_LENGTH).collect())
        .collect();

    let mut result = names.join(AUTHOR_SEP);
    while result.chars().count() > MAX_AUTHORS_LENGTH && names.len() > 1 {
        names.pop();
        result = format!("{}{}", names.join(AUTHOR_SEP), ET_AL);
    }
    result
}
