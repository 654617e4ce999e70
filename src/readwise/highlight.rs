use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Articles,
    Books,
    Tweets,
    Podcasts,
}

impl Category {
    /// Zotero's `book` item type maps to books; everything else is an article.
    pub fn from_document_type(document_type: &str) -> Self {
        if document_type == "book" {
            Category::Books
        } else {
            Category::Articles
        }
    }
}

/// A highlight as accepted by `POST /api/v2/highlights/`. Serializes
/// sparsely: absent fields are left out of the request entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlight {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<u64>,
    pub location_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_url: Option<String>,
}

impl Highlight {
    pub fn new(text: &str, category: Category) -> Self {
        Highlight {
            text: text.to_string(),
            title: None,
            author: None,
            image_url: None,
            source_url: None,
            source_type: None,
            category,
            note: None,
            location: None,
            location_type: "page".to_string(),
            highlighted_at: None,
            highlight_url: None,
        }
    }
}

/// `None` for empty strings so they drop out of the sparse payload.
pub(crate) fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_document_type() {
        assert_eq!(Category::from_document_type("book"), Category::Books);
        assert_eq!(Category::from_document_type("journalArticle"), Category::Articles);
        assert_eq!(Category::from_document_type("bookSection"), Category::Articles);
        assert_eq!(serde_json::to_value(Category::Podcasts).unwrap(), "podcasts");
    }

    #[test]
    fn test_sparse_serialization() {
        let mut highlight = Highlight::new("Sample text", Category::Books);
        highlight.title = Some("Sample Book".into());
        let value = serde_json::to_value(&highlight).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "text": "Sample text",
                "title": "Sample Book",
                "category": "books",
                "location_type": "page"
            })
        );

        highlight.location = Some(10);
        highlight.note = Some(".tag\ncomment".into());
        let value = serde_json::to_value(&highlight).unwrap();
        assert_eq!(value["location"], 10);
        assert_eq!(value["note"], ".tag\ncomment");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(""), None);
        assert_eq!(non_empty("x"), Some("x".to_string()));
    }
}
