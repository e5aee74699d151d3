//! Update and delete commands.

use anyhow::Result;
use uuid::Uuid;

use doc_store_core::models::{DeleteOutcome, DocumentPatch};
use doc_store_core::store::Store;

use crate::config::Config;
use crate::db;

pub async fn run_update(
    config: &Config,
    developer_id: Uuid,
    doc_id: Uuid,
    index: i64,
    patch: DocumentPatch,
) -> Result<()> {
    if patch.is_empty() {
        anyhow::bail!("nothing to update: pass --title, --content, --language or --metadata");
    }
    let store = db::open_store(config).await?;
    let doc = store.update(developer_id, doc_id, index, patch).await?;
    store.pool().close().await;
    println!(
        "updated {}#{} at {}",
        doc.doc_id,
        doc.index,
        doc.updated_at.to_rfc3339()
    );
    Ok(())
}

/// Delete a whole document, or one chunk when `index` is given.
/// Deleting something absent is not an error.
pub async fn run_delete(
    config: &Config,
    developer_id: Uuid,
    doc_id: Uuid,
    index: Option<i64>,
) -> Result<()> {
    let store = db::open_store(config).await?;
    let outcome = match index {
        Some(index) => store.delete_chunk(developer_id, doc_id, index).await?,
        None => store.delete(developer_id, doc_id).await?,
    };
    store.pool().close().await;
    match outcome {
        DeleteOutcome::Deleted { chunks, links } => {
            println!("deleted {} chunk(s), {} link(s)", chunks, links)
        }
        DeleteOutcome::NotFound => println!("not found"),
    }
    Ok(())
}
