use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::ItemError;
use crate::failures::FailureRecord;
use crate::model::NormalizedItem;

use super::highlight::{Category, Highlight, non_empty};

/// Readwise rejects highlights of this many characters or more.
pub const MAX_HIGHLIGHT_LENGTH: usize = 8191;

/// Lower-cased, trimmed, with inner spaces turned into underscores so the tag
/// survives Readwise's `.tag` inline syntax.
pub fn sanitize_tag(tag: &str) -> String {
    tag.to_lowercase().trim().replace(' ', "_")
}

#[derive(Debug, Default)]
pub struct ConvertOutcome {
    pub highlights: Vec<Highlight>,
    pub failures: Vec<FailureRecord>,
}

pub struct HighlightConverter {
    custom_tag: Option<String>,
}

impl HighlightConverter {
    pub fn new(custom_tag: Option<String>) -> Self {
        Self {
            custom_tag: custom_tag.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn convert_batch(&self, items: &[NormalizedItem]) -> ConvertOutcome {
        tracing::info!(count = items.len(), "converting zotero items to readwise highlights");

        let mut outcome = ConvertOutcome::default();
        for item in items {
            match self.convert(item) {
                Ok(highlight) => outcome.highlights.push(highlight),
                Err(e) => {
                    let failure = FailureRecord::new(item, &e);
                    tracing::warn!(
                        key = %item.key,
                        version = item.version,
                        title = item.title.as_deref().unwrap_or(""),
                        error_type = %failure.error_type,
                        "failed to convert item: {}",
                        failure.error_message
                    );
                    outcome.failures.push(failure);
                }
            }
        }
        outcome
    }

    pub fn convert(&self, item: &NormalizedItem) -> Result<Highlight, ItemError> {
        let length = item.text.chars().count();
        if length >= MAX_HIGHLIGHT_LENGTH {
            return Err(ItemError::LengthExceeded {
                length,
                limit: MAX_HIGHLIGHT_LENGTH,
            });
        }

        let location = page_location(item.page_label.as_deref());
        let deep_link = item
            .attachment_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(|url| pdf_deep_link(url, location, &item.annotation_url));

        let mut highlight = Highlight::new(&item.text, Category::from_document_type(&item.document_type));
        highlight.title = item.title.as_deref().and_then(non_empty);
        highlight.author = non_empty(&item.creators);
        highlight.source_url = non_empty(&item.source_url);
        highlight.note = self.compose_note(&item.tags, &item.comment);
        highlight.location = location;
        highlight.highlighted_at = highlighted_at(&item.annotated_at)?;
        highlight.highlight_url = deep_link.or_else(|| non_empty(&item.annotation_url));
        Ok(highlight)
    }

    /// `.custom .tag1 .tag2\ncomment`. The tag line is newline-terminated
    /// whenever it exists; `None` when there is nothing to say.
    pub fn compose_note(&self, tags: &[String], comment: &str) -> Option<String> {
        let mut tokens: Vec<String> = Vec::new();
        if let Some(custom) = &self.custom_tag {
            tokens.push(format!(".{}", sanitize_tag(custom)));
        }
        tokens.extend(tags.iter().map(|t| format!(".{}", sanitize_tag(t))));

        let mut note = String::new();
        if !tokens.is_empty() {
            note.push_str(&tokens.join(" "));
            note.push('\n');
        }
        note.push_str(comment);
        non_empty(&note)
    }
}

/// Numeric page labels only. Zero is Readwise's "no location", so page 0 is
/// dropped as well.
fn page_location(page_label: Option<&str>) -> Option<u64> {
    let label = page_label?;
    if label.is_empty() || !label.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match label.parse::<u64>() {
        Ok(0) => None,
        Ok(page) => Some(page),
        Err(e) => {
            tracing::warn!(page_label = label, error = %e, "page label out of range, dropping location");
            None
        }
    }
}

fn last_segment(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}

fn pdf_deep_link(attachment_url: &str, location: Option<u64>, annotation_url: &str) -> String {
    let page = location.map(|p| p.to_string()).unwrap_or_default();
    format!(
        "zotero://open-pdf/library/items/{}?page={}&annotation={}",
        last_segment(attachment_url),
        page,
        last_segment(annotation_url)
    )
}

fn highlighted_at(annotated_at: &str) -> Result<Option<String>, ItemError> {
    if annotated_at.is_empty() {
        return Ok(None);
    }
    let parsed = DateTime::parse_from_rfc3339(annotated_at).map_err(|source| {
        ItemError::InvalidTimestamp {
            value: annotated_at.to_string(),
            source,
        }
    })?;
    Ok(Some(
        parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::AutoSi, true),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemType;

    fn item(text: &str) -> NormalizedItem {
        let mut item = NormalizedItem::new(
            "ABC123",
            100,
            ItemType::Annotation,
            text.to_string(),
            "2023-01-01T12:00:00Z",
            "https://www.zotero.org/users/123/items/ABC123",
        );
        item.title = Some("Sample Paper".into());
        item.document_type = "journalArticle".into();
        item.creators = "John Doe, Jane Smith".into();
        item.source_url = "https://www.zotero.org/users/123/items/PARENT123".into();
        item.page_label = Some("10".into());
        item.tags = vec!["important".into(), "machine learning".into()];
        item.comment = "This is a comment".into();
        item
    }

    #[test]
    fn test_sanitize_tag() {
        assert_eq!(sanitize_tag(" Machine Learning "), "machine_learning");
        assert_eq!(sanitize_tag("  Deep   Learning  "), "deep___learning");
        assert_eq!(sanitize_tag("   "), "");
        assert_eq!(sanitize_tag("C++"), "c++");
    }

    #[test]
    fn test_compose_note() {
        let plain = HighlightConverter::new(None);
        let tags = vec!["important".to_string(), "Research Topic".to_string()];
        assert_eq!(
            plain.compose_note(&tags, "This is a great insight").as_deref(),
            Some(".important .research_topic\nThis is a great insight")
        );
        assert_eq!(plain.compose_note(&tags[..1], "").as_deref(), Some(".important\n"));
        assert_eq!(plain.compose_note(&[], "Just a comment").as_deref(), Some("Just a comment"));
        assert_eq!(plain.compose_note(&[], ""), None);

        let tagged = HighlightConverter::new(Some("From Zotero".into()));
        assert_eq!(tagged.compose_note(&[], "").as_deref(), Some(".from_zotero\n"));
        assert_eq!(
            tagged.compose_note(&tags[..1], "c").as_deref(),
            Some(".from_zotero .important\nc")
        );
    }

    #[test]
    fn test_page_location() {
        assert_eq!(page_location(Some("10")), Some(10));
        assert_eq!(page_location(Some("abc")), None);
        assert_eq!(page_location(Some("0")), None);
        assert_eq!(page_location(Some("")), None);
        assert_eq!(page_location(Some("-3")), None);
        assert_eq!(page_location(Some("iv")), None);
        assert_eq!(page_location(None), None);
    }

    #[test]
    fn test_page_location_beyond_u32() {
        assert_eq!(page_location(Some("4294967295")), Some(4294967295));
        assert_eq!(page_location(Some("4294967296")), Some(4294967296));
        assert_eq!(page_location(Some("99999999999999999999999")), None);
    }

    #[test]
    fn test_convert_article() {
        let converter = HighlightConverter::new(None);
        let highlight = converter.convert(&item("Sample highlight")).unwrap();
        assert_eq!(highlight.text, "Sample highlight");
        assert_eq!(highlight.title.as_deref(), Some("Sample Paper"));
        assert_eq!(highlight.author.as_deref(), Some("John Doe, Jane Smith"));
        assert_eq!(highlight.category, Category::Articles);
        assert_eq!(highlight.location, Some(10));
        assert_eq!(highlight.location_type, "page");
        assert_eq!(highlight.highlighted_at.as_deref(), Some("2023-01-01T12:00:00Z"));
        assert_eq!(
            highlight.note.as_deref(),
            Some(".important .machine_learning\nThis is a comment")
        );
        assert_eq!(
            highlight.highlight_url.as_deref(),
            Some("https://www.zotero.org/users/123/items/ABC123")
        );
    }

    #[test]
    fn test_convert_book_with_pdf_link() {
        let converter = HighlightConverter::new(None);
        let mut book = item("Sample highlight");
        book.document_type = "book".into();
        book.page_label = Some("5".into());
        book.attachment_url = Some("https://api.zotero.org/users/123/items/ATTACH456".into());
        let highlight = converter.convert(&book).unwrap();
        assert_eq!(highlight.category, Category::Books);
        assert_eq!(
            highlight.highlight_url.as_deref(),
            Some("zotero://open-pdf/library/items/ATTACH456?page=5&annotation=ABC123")
        );

        book.page_label = Some("xii".into());
        let highlight = converter.convert(&book).unwrap();
        assert_eq!(highlight.location, None);
        assert_eq!(
            highlight.highlight_url.as_deref(),
            Some("zotero://open-pdf/library/items/ATTACH456?page=&annotation=ABC123")
        );
    }

    #[test]
    fn test_length_limit_boundary() {
        let converter = HighlightConverter::new(None);
        let items = vec![item(&"a".repeat(8200)), item(&"b".repeat(8190)), item(&"c".repeat(8191))];
        let outcome = converter.convert_batch(&items);

        assert_eq!(outcome.highlights.len(), 1);
        assert_eq!(outcome.highlights[0].text.len(), 8190);
        assert_eq!(outcome.failures.len(), 2);
        assert!(outcome.failures.iter().all(|f| f.error_type == "length-exceeded"));
        assert!(outcome.failures[0].error_message.contains("8200"));
        assert!(outcome.failures[1].error_message.contains("8191 chars"));
        assert_eq!(outcome.failures[0].item["key"], "ABC123");
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let converter = HighlightConverter::new(None);
        assert!(converter.convert(&item(&"é".repeat(8190))).is_ok());
    }

    #[test]
    fn test_invalid_timestamp_is_item_failure() {
        let converter = HighlightConverter::new(None);
        let mut bad = item("text");
        bad.annotated_at = "yesterday".into();
        let outcome = converter.convert_batch(&[bad, item("fine")]);
        assert_eq!(outcome.highlights.len(), 1);
        assert_eq!(outcome.failures[0].error_type, "conversion");
    }

    #[test]
    fn test_highlighted_at_normalizes_offset() {
        assert_eq!(
            highlighted_at("2023-01-01T14:00:00+02:00").unwrap().as_deref(),
            Some("2023-01-01T12:00:00Z")
        );
        assert_eq!(highlighted_at("").unwrap(), None);
    }
}
