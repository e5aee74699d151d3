//! Core data models: documents, chunks, owners, and write payloads.
//!
//! A logical document may be split into ordered chunks that share a
//! `doc_id`; each chunk is one [`Document`] row identified by
//! `(doc_id, index)`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::lang::{Language, LanguageRegistry};

/// Free-form key/value metadata attached to a document.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Maximum title length in characters.
pub const MAX_TITLE_CHARS: usize = 800;

/// Content modality of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Image,
    Mixed,
}

impl Modality {
    pub fn as_str(self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Image => "image",
            Modality::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Modality::Text),
            "image" => Ok(Modality::Image),
            "mixed" => Ok(Modality::Mixed),
            other => Err(StoreError::validation(
                "modality",
                format!("'{}' is not one of text, image, mixed", other),
            )),
        }
    }
}

/// Kind of entity a document can be linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    User,
    Agent,
}

impl OwnerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OwnerKind::User => "user",
            OwnerKind::Agent => "agent",
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OwnerKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(OwnerKind::User),
            "agent" => Ok(OwnerKind::Agent),
            other => Err(StoreError::validation(
                "owner_kind",
                format!("'{}' is not one of user, agent", other),
            )),
        }
    }
}

/// A user or agent that documents can be linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: OwnerKind,
    pub id: Uuid,
}

impl OwnerRef {
    pub fn user(id: Uuid) -> Self {
        Self {
            kind: OwnerKind::User,
            id,
        }
    }

    pub fn agent(id: Uuid) -> Self {
        Self {
            kind: OwnerKind::Agent,
            id,
        }
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// One persisted chunk of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub developer_id: Uuid,
    pub doc_id: Uuid,
    pub index: i64,
    pub title: String,
    pub content: String,
    pub modality: Modality,
    pub embedding_model: String,
    pub embedding_dimensions: i64,
    pub language: String,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ingestion payload. `doc_id` is assigned when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub developer_id: Uuid,
    #[serde(default)]
    pub doc_id: Option<Uuid>,
    #[serde(default)]
    pub index: i64,
    pub title: String,
    pub content: String,
    pub modality: Modality,
    pub embedding_model: String,
    pub embedding_dimensions: i64,
    pub language: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewDocument {
    /// Check every field, returning the resolved language on success.
    pub fn validate(&self) -> Result<Language> {
        if self.index < 0 {
            return Err(StoreError::validation(
                "index",
                format!("must be >= 0, got {}", self.index),
            ));
        }
        if self.embedding_dimensions <= 0 {
            return Err(StoreError::validation(
                "embedding_dimensions",
                format!("must be > 0, got {}", self.embedding_dimensions),
            ));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(StoreError::validation(
                "embedding_model",
                "must not be empty",
            ));
        }
        validate_title(&self.title)?;
        LanguageRegistry::global().resolve(&self.language)
    }

    /// Materialize into a stored row with `doc_id` and timestamps filled in.
    pub fn into_document(self, now: DateTime<Utc>) -> Document {
        Document {
            developer_id: self.developer_id,
            doc_id: self.doc_id.unwrap_or_else(Uuid::new_v4),
            index: self.index,
            title: self.title,
            content: self.content,
            modality: self.modality,
            embedding_model: self.embedding_model,
            embedding_dimensions: self.embedding_dimensions,
            language: self.language,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields an update may change. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.language.is_none()
            && self.metadata.is_none()
    }

    /// Validate the supplied fields only.
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(language) = &self.language {
            LanguageRegistry::global().resolve(language)?;
        }
        Ok(())
    }

    /// Apply to `doc`. Returns true when a field the search index derives
    /// from (title, content, language) changed.
    pub fn apply(self, doc: &mut Document, now: DateTime<Utc>) -> bool {
        let mut reindex = false;
        if let Some(title) = self.title {
            reindex |= title != doc.title;
            doc.title = title;
        }
        if let Some(content) = self.content {
            reindex |= content != doc.content;
            doc.content = content;
        }
        if let Some(language) = self.language {
            reindex |= language != doc.language;
            doc.language = language;
        }
        if let Some(metadata) = self.metadata {
            doc.metadata = metadata;
        }
        // Strictly advance even when two updates land in the same millisecond.
        doc.updated_at = if now > doc.updated_at {
            now
        } else {
            doc.updated_at + chrono::Duration::milliseconds(1)
        };
        reindex
    }
}

fn validate_title(title: &str) -> Result<()> {
    let len = title.chars().count();
    if len > MAX_TITLE_CHARS {
        return Err(StoreError::validation(
            "title",
            format!("must be at most {} characters, got {}", MAX_TITLE_CHARS, len),
        ));
    }
    Ok(())
}

/// Result of a delete call. Deleting something absent is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted { chunks: u64, links: u64 },
    NotFound,
}

/// Current time truncated to millisecond precision, matching what the
/// SQLite backend can round-trip.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}
