//! Document retrieval (`dstore get`).

use anyhow::{bail, Result};
use uuid::Uuid;

use doc_store_core::models::{Document, OwnerRef};
use doc_store_core::store::Store;

use crate::config::Config;
use crate::db;

/// A document's chunks and ownership links.
#[derive(Debug, Clone)]
pub struct DocumentView {
    pub chunks: Vec<Document>,
    pub owners: Vec<OwnerRef>,
}

/// Load a document. Fails if it does not exist for `developer_id`.
pub async fn get_document<S: Store + ?Sized>(
    store: &S,
    developer_id: Uuid,
    doc_id: Uuid,
) -> Result<DocumentView> {
    let chunks = store.get(developer_id, doc_id).await?;
    if chunks.is_empty() {
        bail!("document not found: {}", doc_id);
    }
    let owners = store.owners_of(developer_id, doc_id).await?;
    Ok(DocumentView { chunks, owners })
}

pub async fn run_get(config: &Config, developer_id: Uuid, doc_id: Uuid) -> Result<()> {
    let store = db::open_store(config).await?;
    let view = get_document(&store, developer_id, doc_id).await?;
    store.pool().close().await;

    let Some(first) = view.chunks.first() else {
        return Ok(());
    };
    println!("--- Document ---");
    println!("id:         {}", first.doc_id);
    println!("title:      {}", first.title);
    println!("modality:   {}", first.modality);
    println!(
        "embedding:  {} ({} dims)",
        first.embedding_model, first.embedding_dimensions
    );
    println!("language:   {}", first.language);
    println!("created_at: {}", first.created_at.to_rfc3339());
    println!("updated_at: {}", first.updated_at.to_rfc3339());
    println!("metadata:   {}", serde_json::Value::Object(first.metadata.clone()));
    if !view.owners.is_empty() {
        let owners: Vec<String> = view.owners.iter().map(|o| o.to_string()).collect();
        println!("owners:     {}", owners.join(", "));
    }
    println!();

    println!("--- Chunks ({}) ---", view.chunks.len());
    for chunk in &view.chunks {
        println!("[chunk {}]", chunk.index);
        println!("{}", chunk.content);
        println!();
    }
    Ok(())
}
