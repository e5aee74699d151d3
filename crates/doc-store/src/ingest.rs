//! Ingestion: turn one `put` request into stored chunks.
//!
//! Without splitting, the request becomes a single chunk at the requested
//! index. With splitting, the content is cut on paragraph boundaries by
//! [`split_content`] and stored as consecutive chunks sharing one document
//! id, all in one atomic [`Store::create_many`] call.

use anyhow::{Context, Result};
use uuid::Uuid;

use doc_store_core::chunk::split_content;
use doc_store_core::models::{Document, Metadata, Modality, NewDocument};
use doc_store_core::store::Store;
use doc_store_core::StoreError;

use crate::config::Config;
use crate::db;

/// Everything needed to ingest one document.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub developer_id: Uuid,
    pub doc_id: Option<Uuid>,
    pub index: i64,
    pub title: String,
    pub content: String,
    pub modality: Modality,
    pub embedding_model: String,
    pub embedding_dimensions: i64,
    pub language: String,
    pub metadata: Metadata,
}

impl IngestRequest {
    fn chunk(&self, doc_id: Uuid, index: i64, content: String) -> NewDocument {
        NewDocument {
            developer_id: self.developer_id,
            doc_id: Some(doc_id),
            index,
            title: self.title.clone(),
            content,
            modality: self.modality,
            embedding_model: self.embedding_model.clone(),
            embedding_dimensions: self.embedding_dimensions,
            language: self.language.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Expand a request into chunk payloads. Indices start at `req.index`.
///
/// Fails with a validation error on `index` when the pieces would number
/// past `i64::MAX`.
pub fn build_chunks(
    req: &IngestRequest,
    split_tokens: Option<usize>,
) -> doc_store_core::Result<Vec<NewDocument>> {
    let doc_id = req.doc_id.unwrap_or_else(Uuid::new_v4);
    let Some(max_tokens) = split_tokens else {
        return Ok(vec![req.chunk(doc_id, req.index, req.content.clone())]);
    };
    split_content(&req.content, max_tokens)
        .into_iter()
        .enumerate()
        .map(|(i, piece)| {
            let index = i64::try_from(i)
                .ok()
                .and_then(|offset| req.index.checked_add(offset))
                .ok_or_else(|| {
                    StoreError::validation(
                        "index",
                        format!("chunk {} after index {} overflows", i, req.index),
                    )
                })?;
            Ok(req.chunk(doc_id, index, piece))
        })
        .collect()
}

/// Store the chunks of one request. Multi-chunk requests are atomic.
pub async fn ingest<S: Store + ?Sized>(
    store: &S,
    req: &IngestRequest,
    split_tokens: Option<usize>,
) -> Result<Vec<Document>> {
    let mut chunks = build_chunks(req, split_tokens)?;
    let created = if chunks.len() == 1 {
        let chunk = chunks.remove(0);
        vec![store.create(chunk).await?]
    } else {
        store.create_many(chunks).await?
    };
    Ok(created)
}

/// Parse a `--metadata` argument. Must be a JSON object.
pub fn parse_metadata(raw: &str) -> Result<Metadata> {
    serde_json::from_str::<Metadata>(raw).context("metadata must be a JSON object")
}

/// CLI entry point for `dstore put`.
pub async fn run_put(config: &Config, req: IngestRequest, split: bool) -> Result<()> {
    let store = db::open_store(config).await?;
    let split_tokens = split.then_some(config.chunking.max_tokens);
    let created = ingest(&store, &req, split_tokens).await?;
    for doc in &created {
        println!("created {}#{}", doc.doc_id, doc.index);
    }
    store.pool().close().await;
    Ok(())
}
