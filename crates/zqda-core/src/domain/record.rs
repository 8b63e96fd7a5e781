//! Record entity - one mirrored remote object
//!
//! A [`Record`] is the local shape of an item, attachment, note, annotation or
//! collection. Only the fields the cache must understand are typed; the full
//! remote `data` document is carried alongside for presentation.
//!
//! Collections do not exist as items on the remote side. They are normalized
//! into the record shape by the sync engine, which also denormalizes their
//! direct members into [`RecordKind::Collection::items`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::errors::DomainError;
use super::newtypes::RecordKey;

/// Item type name used for collection records and collection members
pub const COLLECTION_TYPE: &str = "collection";

const HTML_CONTENT_TYPE: &str = "text/html";
const ZIP_CONTENT_TYPE: &str = "application/zip";

// ============================================================================
// Link mode
// ============================================================================

/// How an attachment relates to its payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LinkMode {
    /// File uploaded to the remote storage
    ImportedFile,
    /// Web page snapshot stored remotely
    ImportedUrl,
    /// Link to a file on the uploader's disk; nothing to download
    LinkedFile,
    /// Plain URL; nothing to download
    LinkedUrl,
    /// Image embedded in a note
    EmbeddedImage,
    /// Any mode this version does not know about
    Unknown(String),
}

impl LinkMode {
    /// Map the remote `linkMode` string
    pub fn from_remote(mode: &str) -> Self {
        match mode {
            "imported_file" => Self::ImportedFile,
            "imported_url" => Self::ImportedUrl,
            "linked_file" => Self::LinkedFile,
            "linked_url" => Self::LinkedUrl,
            "embedded_image" => Self::EmbeddedImage,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Remote string representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::ImportedFile => "imported_file",
            Self::ImportedUrl => "imported_url",
            Self::LinkedFile => "linked_file",
            Self::LinkedUrl => "linked_url",
            Self::EmbeddedImage => "embedded_image",
            Self::Unknown(other) => other,
        }
    }

    /// Link-only attachments have no payload stored on the remote side
    pub fn is_link(&self) -> bool {
        matches!(self, Self::LinkedFile | Self::LinkedUrl)
    }
}

impl From<String> for LinkMode {
    fn from(s: String) -> Self {
        Self::from_remote(&s)
    }
}

impl From<LinkMode> for String {
    fn from(mode: LinkMode) -> Self {
        mode.as_str().to_string()
    }
}

// ============================================================================
// Variant payloads
// ============================================================================

/// Attachment metadata needed to locate and serve the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInfo {
    #[serde(rename = "parentItem", default, skip_serializing_if = "Option::is_none")]
    pub parent_item: Option<RecordKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(rename = "contentType", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(rename = "linkMode")]
    pub link_mode: LinkMode,
}

/// A direct member of a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMember {
    pub key: RecordKey,
    /// Remote item type, or `collection` for subcollections
    #[serde(rename = "itemType")]
    pub item_type: String,
}

impl CollectionMember {
    pub fn item(key: RecordKey, item_type: impl Into<String>) -> Self {
        Self {
            key,
            item_type: item_type.into(),
        }
    }

    pub fn subcollection(key: RecordKey) -> Self {
        Self::item(key, COLLECTION_TYPE)
    }
}

/// Kind discriminator with the per-variant fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "itemType", rename_all = "lowercase")]
pub enum RecordKind {
    /// Regular bibliographic item; keeps its remote type (`book`, ...)
    Item {
        #[serde(rename = "remoteType")]
        item_type: String,
    },
    Attachment(AttachmentInfo),
    Note {
        #[serde(rename = "parentItem", default, skip_serializing_if = "Option::is_none")]
        parent_item: Option<RecordKey>,
    },
    Annotation {
        #[serde(rename = "parentItem", default, skip_serializing_if = "Option::is_none")]
        parent_item: Option<RecordKey>,
    },
    Collection {
        name: String,
        #[serde(rename = "parentCollection", default, skip_serializing_if = "Option::is_none")]
        parent_collection: Option<RecordKey>,
        /// Direct member items and subcollections, recomputed on every sync
        #[serde(default)]
        items: Vec<CollectionMember>,
    },
}

// ============================================================================
// Record
// ============================================================================

/// One remote object mirrored into the local store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    key: RecordKey,
    version: u64,
    #[serde(flatten)]
    kind: RecordKind,
    #[serde(default)]
    collections: Vec<RecordKey>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    data: Value,
    /// Formatted citation, when the remote rendered one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bib: Option<String>,
}

/// Remote `data` fields the mirror understands; everything else stays opaque
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemFields {
    #[serde(default)]
    item_type: String,
    #[serde(default, deserialize_with = "falsy_key")]
    parent_item: Option<RecordKey>,
    #[serde(default)]
    collections: Vec<RecordKey>,
    #[serde(default)]
    tags: Vec<TagEntry>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    link_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    tag: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionFields {
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "falsy_key")]
    parent_collection: Option<RecordKey>,
}

/// The remote sends `false` or `""` where a parent link is absent
fn falsy_key<'de, D>(deserializer: D) -> Result<Option<RecordKey>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => RecordKey::new(s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

fn dedup_tags(entries: Vec<TagEntry>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        if !tags.contains(&entry.tag) {
            tags.push(entry.tag);
        }
    }
    tags
}

impl Record {
    /// Map a remote item document (`data` of an items response) onto a record
    ///
    /// # Errors
    /// Returns `DomainError::InvalidRecord` if a typed field is malformed
    pub fn from_remote_item(key: RecordKey, version: u64, data: Value) -> Result<Self, DomainError> {
        let fields: ItemFields = serde_json::from_value(data.clone())
            .map_err(|e| DomainError::InvalidRecord(format!("{key}: {e}")))?;

        let kind = match fields.item_type.as_str() {
            "attachment" => RecordKind::Attachment(AttachmentInfo {
                parent_item: fields.parent_item,
                filename: fields.filename.filter(|f| !f.is_empty()),
                content_type: fields.content_type.filter(|c| !c.is_empty()),
                link_mode: LinkMode::from_remote(fields.link_mode.as_deref().unwrap_or_default()),
            }),
            "note" => RecordKind::Note {
                parent_item: fields.parent_item,
            },
            "annotation" => RecordKind::Annotation {
                parent_item: fields.parent_item,
            },
            "" => {
                return Err(DomainError::InvalidRecord(format!(
                    "{key}: missing itemType"
                )))
            }
            other => RecordKind::Item {
                item_type: other.to_string(),
            },
        };

        Ok(Self {
            key,
            version,
            kind,
            collections: fields.collections,
            tags: dedup_tags(fields.tags),
            data,
            bib: None,
        })
    }

    /// Normalize a remote collection into the record shape
    ///
    /// # Errors
    /// Returns `DomainError::InvalidRecord` if a typed field is malformed
    pub fn from_remote_collection(
        key: RecordKey,
        version: u64,
        data: Value,
        members: Vec<CollectionMember>,
    ) -> Result<Self, DomainError> {
        let fields: CollectionFields = serde_json::from_value(data.clone())
            .map_err(|e| DomainError::InvalidRecord(format!("{key}: {e}")))?;

        Ok(Self {
            key,
            version,
            kind: RecordKind::Collection {
                name: fields.name,
                parent_collection: fields.parent_collection,
                items: members,
            },
            collections: Vec::new(),
            tags: Vec::new(),
            data,
            bib: None,
        })
    }

    /// Attach the formatted citation delivered with `include=bib`
    #[must_use]
    pub fn with_bib(mut self, bib: Option<String>) -> Self {
        self.bib = bib.filter(|b| !b.is_empty());
        self
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn kind(&self) -> &RecordKind {
        &self.kind
    }

    /// Display type: the remote type for items, the variant name otherwise
    pub fn item_type(&self) -> &str {
        match &self.kind {
            RecordKind::Item { item_type } => item_type,
            RecordKind::Attachment(_) => "attachment",
            RecordKind::Note { .. } => "note",
            RecordKind::Annotation { .. } => "annotation",
            RecordKind::Collection { .. } => COLLECTION_TYPE,
        }
    }

    pub fn parent_item(&self) -> Option<&RecordKey> {
        match &self.kind {
            RecordKind::Attachment(info) => info.parent_item.as_ref(),
            RecordKind::Note { parent_item } | RecordKind::Annotation { parent_item } => {
                parent_item.as_ref()
            }
            RecordKind::Item { .. } | RecordKind::Collection { .. } => None,
        }
    }

    pub fn parent_collection(&self) -> Option<&RecordKey> {
        match &self.kind {
            RecordKind::Collection {
                parent_collection, ..
            } => parent_collection.as_ref(),
            _ => None,
        }
    }

    pub fn collections(&self) -> &[RecordKey] {
        &self.collections
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn bib(&self) -> Option<&str> {
        self.bib.as_deref()
    }

    pub fn attachment(&self) -> Option<&AttachmentInfo> {
        match &self.kind {
            RecordKind::Attachment(info) => Some(info),
            _ => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, RecordKind::Collection { .. })
    }

    pub fn is_annotation(&self) -> bool {
        matches!(self.kind, RecordKind::Annotation { .. })
    }

    /// Direct members for collection records
    pub fn members(&self) -> &[CollectionMember] {
        match &self.kind {
            RecordKind::Collection { items, .. } => items,
            _ => &[],
        }
    }

    /// True when the record hangs off a collection or a parent item
    pub fn is_filed(&self) -> bool {
        !self.collections.is_empty() || self.parent_item().is_some()
    }

    /// Remote snapshots of web pages are delivered zipped
    ///
    /// Rewrites `text/html` attachments to `<key>.zip` / `application/zip`,
    /// in both the typed fields and the raw `data` document. Returns true if
    /// the record was changed.
    pub fn remap_html_snapshot(&mut self) -> bool {
        let filename = format!("{}.zip", self.key);
        let RecordKind::Attachment(info) = &mut self.kind else {
            return false;
        };
        if info.content_type.as_deref() != Some(HTML_CONTENT_TYPE) {
            return false;
        }

        info.filename = Some(filename.clone());
        info.content_type = Some(ZIP_CONTENT_TYPE.to_string());
        if let Value::Object(map) = &mut self.data {
            map.insert("filename".to_string(), Value::String(filename));
            map.insert(
                "contentType".to_string(),
                Value::String(ZIP_CONTENT_TYPE.to_string()),
            );
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(s: &str) -> RecordKey {
        RecordKey::new(s.to_string()).unwrap()
    }

    #[test]
    fn test_regular_item_keeps_remote_type() {
        let record = Record::from_remote_item(
            key("I1"),
            12,
            json!({
                "key": "I1",
                "itemType": "book",
                "title": "Grounded Theory",
                "collections": ["C1"],
                "tags": [{"tag": "method"}, {"tag": "qual", "type": 1}, {"tag": "method"}]
            }),
        )
        .unwrap();

        assert!(matches!(record.kind(), RecordKind::Item { .. }));
        assert_eq!(record.item_type(), "book");
        assert_eq!(record.version(), 12);
        assert_eq!(record.collections(), &[key("C1")]);
        assert_eq!(record.tags(), &["method".to_string(), "qual".to_string()]);
        assert_eq!(record.data()["title"], "Grounded Theory");
        assert!(record.is_filed());
    }

    #[test]
    fn test_attachment_fields() {
        let record = Record::from_remote_item(
            key("A1"),
            3,
            json!({
                "itemType": "attachment",
                "parentItem": "I1",
                "linkMode": "imported_file",
                "filename": "paper.pdf",
                "contentType": "application/pdf"
            }),
        )
        .unwrap();

        let info = record.attachment().unwrap();
        assert_eq!(info.filename.as_deref(), Some("paper.pdf"));
        assert_eq!(info.link_mode, LinkMode::ImportedFile);
        assert_eq!(record.parent_item(), Some(&key("I1")));
        assert!(record.is_filed());
    }

    #[test]
    fn test_missing_item_type_is_rejected() {
        let result = Record::from_remote_item(key("X1"), 1, json!({"title": "?"}));
        assert!(matches!(result, Err(DomainError::InvalidRecord(_))));
    }

    #[test]
    fn test_collection_with_false_parent() {
        let record = Record::from_remote_collection(
            key("C1"),
            5,
            json!({"key": "C1", "name": "Interviews", "parentCollection": false}),
            vec![
                CollectionMember::item(key("I1"), "book"),
                CollectionMember::subcollection(key("C2")),
            ],
        )
        .unwrap();

        assert!(record.is_collection());
        assert_eq!(record.item_type(), "collection");
        assert_eq!(record.parent_collection(), None);
        assert_eq!(record.members().len(), 2);
        assert_eq!(record.members()[1].item_type, "collection");
    }

    #[test]
    fn test_filed_detection() {
        let root = Record::from_remote_item(key("I1"), 1, json!({"itemType": "book"})).unwrap();
        assert!(!root.is_filed());

        let note = Record::from_remote_item(
            key("N1"),
            1,
            json!({"itemType": "note", "parentItem": "I1"}),
        )
        .unwrap();
        assert!(note.is_filed());
    }

    #[test]
    fn test_html_snapshot_remap() {
        let mut record = Record::from_remote_item(
            key("S1"),
            2,
            json!({
                "itemType": "attachment",
                "linkMode": "imported_url",
                "filename": "page.html",
                "contentType": "text/html"
            }),
        )
        .unwrap();

        assert!(record.remap_html_snapshot());
        let info = record.attachment().unwrap();
        assert_eq!(info.filename.as_deref(), Some("S1.zip"));
        assert_eq!(info.content_type.as_deref(), Some("application/zip"));
        assert_eq!(record.data()["filename"], "S1.zip");
        assert_eq!(record.data()["contentType"], "application/zip");

        // Already remapped
        assert!(!record.remap_html_snapshot());
    }

    #[test]
    fn test_link_modes() {
        assert!(LinkMode::from_remote("linked_url").is_link());
        assert!(LinkMode::from_remote("linked_file").is_link());
        assert!(!LinkMode::from_remote("imported_url").is_link());
        assert_eq!(
            LinkMode::from_remote("future_mode"),
            LinkMode::Unknown("future_mode".to_string())
        );
    }

    #[test]
    fn test_stored_document_round_trip() {
        let record = Record::from_remote_item(
            key("A2"),
            9,
            json!({
                "itemType": "attachment",
                "parentItem": "I1",
                "linkMode": "linked_url",
                "url": "https://example.org"
            }),
        )
        .unwrap()
        .with_bib(Some("<div class=\"csl-entry\">Doe 2020</div>".to_string()));

        let stored = serde_json::to_value(&record).unwrap();
        assert_eq!(stored["itemType"], "attachment");
        assert_eq!(stored["parentItem"], "I1");
        assert_eq!(stored["linkMode"], "linked_url");
        assert!(stored["bib"].as_str().unwrap().contains("Doe 2020"));

        let back: Record = serde_json::from_value(stored).unwrap();
        assert_eq!(back, record);
    }
}
