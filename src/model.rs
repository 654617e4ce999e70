use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// A record as returned by the Zotero web API: annotations, notes, and the
/// attachments and top-level documents they hang off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub key: String,
    pub version: i64,
    pub data: RecordData,
    #[serde(default)]
    pub links: RecordLinks,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordData {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub version: i64,
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_page_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_sort_index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub creators: Vec<Creator>,
    #[serde(default)]
    pub date_modified: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub relations: Map<String, JsonValue>,
}

impl RecordData {
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.tag.as_str())
    }

    /// `dc:relation` links. The API emits a bare string for a single relation
    /// and an array for several.
    pub fn related_items(&self) -> Option<Vec<String>> {
        match self.relations.get("dc:relation")? {
            JsonValue::String(s) => Some(vec![s.clone()]),
            JsonValue::Array(values) => Some(
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub tag: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub tag_type: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Creator {
    /// Personal authors come as first/last name pairs, institutional ones
    /// as a single `name`.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            _ => self
                .name
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate: Option<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentLink {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_size: Option<i64>,
}

/// Document-level context shared by every annotation of one top-level item.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub creators: Vec<String>,
    pub tags: Vec<String>,
    pub document_type: String,
    pub source_url: String,
    pub attachment_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Annotation,
    Note,
}

/// The canonical shape every source record is normalized into before it is
/// turned into a destination highlight. `text` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedItem {
    pub key: String,
    pub version: i64,
    pub item_type: ItemType,
    pub text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
    pub annotated_at: String,
    pub annotation_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub document_tags: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub document_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation_type: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub creators: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relations: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_index: Option<String>,
}

impl NormalizedItem {
    /// Bare item with only the identifying fields and the body; document
    /// context is filled in by the normalizer.
    pub fn new(
        key: &str,
        version: i64,
        item_type: ItemType,
        text: String,
        annotated_at: &str,
        annotation_url: &str,
    ) -> Self {
        NormalizedItem {
            key: key.to_string(),
            version,
            item_type,
            text,
            comment: String::new(),
            annotated_at: annotated_at.to_string(),
            annotation_url: annotation_url.to_string(),
            attachment_url: None,
            title: None,
            tags: vec![],
            document_tags: vec![],
            document_type: String::new(),
            annotation_type: None,
            creators: String::new(),
            source_url: String::new(),
            page_label: None,
            color: None,
            relations: None,
            sort_index: None,
        }
    }
}
