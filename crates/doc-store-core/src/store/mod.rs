//! Storage abstraction for documents, ownership links, and their derived
//! search representations.
//!
//! The [`Store`] trait defines every operation the query engine and the
//! surrounding service need, so backends are interchangeable (in-memory
//! here, SQLite in the `doc-store` crate).
//!
//! # Write-path contract
//!
//! Every backend must:
//!
//! - validate input before touching storage ([`prepare_new`],
//!   [`prepare_update`]);
//! - recompute the search representation with
//!   [`index::derive`](crate::index::derive) inside the same atomic unit
//!   as the row change, so readers never see a stale representation;
//! - reject a second chunk with the same `(doc_id, index)` with
//!   [`StoreError::Conflict`], including the loser of a concurrent race;
//! - cascade link removal when the last chunk of a document is deleted.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::index::{self, SearchRepr};
use crate::models::{DeleteOutcome, Document, DocumentPatch, NewDocument, OwnerRef};

/// A stored chunk together with its derived representation.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedChunk {
    pub doc: Document,
    pub repr: SearchRepr,
}

/// Read scope for candidate retrieval.
///
/// Always bounded by `developer_id`. A non-empty `owners` list further
/// restricts to documents linked to at least one of them.
#[derive(Debug, Clone)]
pub struct Scope {
    pub developer_id: Uuid,
    pub owners: Vec<OwnerRef>,
}

impl Scope {
    pub fn developer(developer_id: Uuid) -> Self {
        Self {
            developer_id,
            owners: Vec::new(),
        }
    }
}

/// Abstract document store.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create`](Store::create) | Insert one chunk |
/// | [`create_many`](Store::create_many) | Insert several chunks atomically |
/// | [`get`](Store::get) / [`get_chunk`](Store::get_chunk) | Read back |
/// | [`update`](Store::update) | Patch title/content/language/metadata |
/// | [`delete`](Store::delete) / [`delete_chunk`](Store::delete_chunk) | Idempotent removal |
/// | [`register_owner`](Store::register_owner) / [`remove_owner`](Store::remove_owner) | User/agent endpoints |
/// | [`link`](Store::link) / [`unlink`](Store::unlink) / [`owners_of`](Store::owners_of) | Ownership links |
/// | [`candidates`](Store::candidates) | Indexed chunks visible to a scope |
#[async_trait]
pub trait Store: Send + Sync {
    async fn create(&self, doc: NewDocument) -> Result<Document>;

    /// All-or-nothing insert of several chunks.
    async fn create_many(&self, docs: Vec<NewDocument>) -> Result<Vec<Document>>;

    /// All chunks of a document, ordered by index. Empty when the document
    /// is absent or belongs to another developer.
    async fn get(&self, developer_id: Uuid, doc_id: Uuid) -> Result<Vec<Document>>;

    async fn get_chunk(
        &self,
        developer_id: Uuid,
        doc_id: Uuid,
        index: i64,
    ) -> Result<Option<Document>>;

    async fn update(
        &self,
        developer_id: Uuid,
        doc_id: Uuid,
        index: i64,
        patch: DocumentPatch,
    ) -> Result<Document>;

    /// Remove every chunk of a document and its ownership links.
    async fn delete(&self, developer_id: Uuid, doc_id: Uuid) -> Result<DeleteOutcome>;

    /// Remove one chunk. Links go only with the last chunk.
    async fn delete_chunk(
        &self,
        developer_id: Uuid,
        doc_id: Uuid,
        index: i64,
    ) -> Result<DeleteOutcome>;

    /// Register a user or agent under a developer. Idempotent for the same
    /// developer; a validation error on `owner_id` if the id belongs to
    /// another developer.
    async fn register_owner(&self, developer_id: Uuid, owner: OwnerRef) -> Result<()>;

    /// Remove a user or agent and its links. Returns false if it was absent.
    async fn remove_owner(&self, developer_id: Uuid, owner: OwnerRef) -> Result<bool>;

    /// Attach a document to an owner. Both must exist under `developer_id`.
    async fn link(&self, developer_id: Uuid, doc_id: Uuid, owner: OwnerRef) -> Result<()>;

    /// Detach. Returns false if no link existed.
    async fn unlink(&self, developer_id: Uuid, doc_id: Uuid, owner: OwnerRef) -> Result<bool>;

    async fn owners_of(&self, developer_id: Uuid, doc_id: Uuid) -> Result<Vec<OwnerRef>>;

    /// Last-committed indexed chunks visible to `scope`.
    async fn candidates(&self, scope: &Scope) -> Result<Vec<IndexedChunk>>;
}

/// Validate an ingestion payload and derive its representation.
pub fn prepare_new(doc: NewDocument) -> Result<IndexedChunk> {
    let language = doc.validate()?;
    let now = crate::models::now_millis();
    let doc = doc.into_document(now);
    let repr = index::derive_with(
        crate::lang::LanguageRegistry::global(),
        language,
        &doc.title,
        &doc.content,
    );
    Ok(IndexedChunk { doc, repr })
}

/// Validate a batch: each payload individually, then no duplicate
/// `(doc_id, index)` within the batch.
pub fn prepare_batch(docs: Vec<NewDocument>) -> Result<Vec<IndexedChunk>> {
    let prepared = docs
        .into_iter()
        .map(prepare_new)
        .collect::<Result<Vec<_>>>()?;
    let mut seen = std::collections::HashSet::new();
    for chunk in &prepared {
        if !seen.insert((chunk.doc.doc_id, chunk.doc.index)) {
            return Err(StoreError::conflict(format!(
                "chunk {}#{} appears twice in batch",
                chunk.doc.doc_id, chunk.doc.index
            )));
        }
    }
    Ok(prepared)
}

/// Apply a patch to an existing chunk, recomputing the representation
/// only when title, content or language changed.
pub fn prepare_update(current: &IndexedChunk, patch: DocumentPatch) -> Result<IndexedChunk> {
    patch.validate()?;
    let mut doc = current.doc.clone();
    let reindex = patch.apply(&mut doc, crate::models::now_millis());
    let repr = if reindex {
        index::derive(&doc.title, &doc.content, &doc.language)?
    } else {
        current.repr.clone()
    };
    Ok(IndexedChunk { doc, repr })
}

pub fn duplicate_chunk(doc_id: Uuid, index: i64) -> StoreError {
    StoreError::conflict(format!("chunk {}#{} already exists", doc_id, index))
}

pub fn foreign_document(doc_id: Uuid) -> StoreError {
    StoreError::conflict(format!(
        "document {} belongs to another developer",
        doc_id
    ))
}

/// Owner ids never move between developers, so retrying cannot help.
pub fn foreign_owner(owner: OwnerRef) -> StoreError {
    StoreError::validation(
        "owner_id",
        format!("{} is registered under another developer", owner),
    )
}

pub fn missing_document(developer_id: Uuid, doc_id: Uuid) -> StoreError {
    StoreError::not_found(format!(
        "document {} for developer {}",
        doc_id, developer_id
    ))
}

pub fn missing_owner(developer_id: Uuid, owner: OwnerRef) -> StoreError {
    StoreError::not_found(format!("{} for developer {}", owner, developer_id))
}

pub fn missing_chunk(developer_id: Uuid, doc_id: Uuid, index: i64) -> StoreError {
    StoreError::not_found(format!(
        "chunk {}#{} for developer {}",
        doc_id, index, developer_id
    ))
}
