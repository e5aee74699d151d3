//! SQLite-backed [`Store`] implementation.
//!
//! Each chunk is one row of `documents`; its derived search representation
//! lives beside it in the `search_repr` JSON column and is written by the
//! same statement that changes title, content or language. Every mutation
//! runs in a single transaction.
//!
//! Inserts are issued before any read in their transaction so a racing
//! writer waits on the busy timeout and then fails on the primary key,
//! which surfaces as [`StoreError::Conflict`].

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use doc_store_core::error::{Result, StoreError};
use doc_store_core::index::SearchRepr;
use doc_store_core::models::{
    DeleteOutcome, Document, DocumentPatch, Metadata, Modality, NewDocument, OwnerKind, OwnerRef,
};
use doc_store_core::store::{
    duplicate_chunk, foreign_document, foreign_owner, missing_chunk, missing_document,
    missing_owner, prepare_batch, prepare_new, prepare_update, IndexedChunk, Scope, Store,
};

const CHUNK_COLUMNS: &str = "developer_id, doc_id, idx, title, content, modality, \
     embedding_model, embedding_dimensions, language, metadata_json, search_repr, \
     created_at, updated_at";

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Table names for one owner kind.
struct OwnerTable {
    table: &'static str,
    id_col: &'static str,
    links: &'static str,
}

impl OwnerTable {
    fn of(kind: OwnerKind) -> Self {
        match kind {
            OwnerKind::User => OwnerTable {
                table: "users",
                id_col: "user_id",
                links: "user_docs",
            },
            OwnerKind::Agent => OwnerTable {
                table: "agents",
                id_col: "agent_id",
                links: "agent_docs",
            },
        }
    }
}

/// Map a driver error: unique violations and lock contention become
/// retryable conflicts, everything else is internal.
fn db_err(err: sqlx::Error) -> StoreError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            return StoreError::conflict(db.message().to_string());
        }
        // SQLITE_BUSY, SQLITE_LOCKED, SQLITE_BUSY_SNAPSHOT
        if matches!(db.code().as_deref(), Some("5" | "6" | "517")) {
            return StoreError::conflict(format!("concurrent write: {}", db.message()));
        }
    }
    StoreError::Internal(anyhow::Error::new(err))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

fn from_millis(ms: i64) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| anyhow!("timestamp out of range: {}", ms))
}

fn decode_chunk(row: &SqliteRow) -> anyhow::Result<IndexedChunk> {
    let developer_id: String = row.try_get("developer_id")?;
    let doc_id: String = row.try_get("doc_id")?;
    let modality: String = row.try_get("modality")?;
    let metadata_json: String = row.try_get("metadata_json")?;
    let repr_json: String = row.try_get("search_repr")?;

    let doc = Document {
        developer_id: Uuid::parse_str(&developer_id).context("invalid developer_id")?,
        doc_id: Uuid::parse_str(&doc_id).context("invalid doc_id")?,
        index: row.try_get("idx")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        modality: modality.parse::<Modality>()?,
        embedding_model: row.try_get("embedding_model")?,
        embedding_dimensions: row.try_get("embedding_dimensions")?,
        language: row.try_get("language")?,
        metadata: serde_json::from_str::<Metadata>(&metadata_json)
            .context("invalid metadata_json")?,
        created_at: from_millis(row.try_get("created_at")?)?,
        updated_at: from_millis(row.try_get("updated_at")?)?,
    };
    let repr: SearchRepr = serde_json::from_str(&repr_json).context("invalid search_repr")?;
    Ok(IndexedChunk { doc, repr })
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| StoreError::Internal(e.into()))
}

/// Insert one prepared chunk, then verify the document id is not owned by
/// another developer.
async fn insert_chunk(conn: &mut SqliteConnection, chunk: &IndexedChunk) -> Result<()> {
    let doc = &chunk.doc;
    sqlx::query(&format!(
        "INSERT INTO documents ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        CHUNK_COLUMNS
    ))
    .bind(doc.developer_id.to_string())
    .bind(doc.doc_id.to_string())
    .bind(doc.index)
    .bind(&doc.title)
    .bind(&doc.content)
    .bind(doc.modality.as_str())
    .bind(&doc.embedding_model)
    .bind(doc.embedding_dimensions)
    .bind(&doc.language)
    .bind(encode_json(&doc.metadata)?)
    .bind(encode_json(&chunk.repr)?)
    .bind(doc.created_at.timestamp_millis())
    .bind(doc.updated_at.timestamp_millis())
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            duplicate_chunk(doc.doc_id, doc.index)
        } else {
            db_err(e)
        }
    })?;

    let foreign: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM documents WHERE doc_id = ? AND developer_id != ? LIMIT 1")
            .bind(doc.doc_id.to_string())
            .bind(doc.developer_id.to_string())
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_err)?;
    if foreign.is_some() {
        return Err(foreign_document(doc.doc_id));
    }
    Ok(())
}

async fn document_exists(
    conn: &mut SqliteConnection,
    developer_id: Uuid,
    doc_id: Uuid,
) -> Result<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM documents WHERE developer_id = ? AND doc_id = ? LIMIT 1")
            .bind(developer_id.to_string())
            .bind(doc_id.to_string())
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_err)?;
    Ok(found.is_some())
}

async fn owner_exists(
    conn: &mut SqliteConnection,
    developer_id: Uuid,
    owner: OwnerRef,
) -> Result<bool> {
    let t = OwnerTable::of(owner.kind);
    let found: Option<i64> = sqlx::query_scalar(&format!(
        "SELECT 1 FROM {} WHERE {} = ? AND developer_id = ?",
        t.table, t.id_col
    ))
    .bind(owner.id.to_string())
    .bind(developer_id.to_string())
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(found.is_some())
}

async fn check_link_endpoints(
    conn: &mut SqliteConnection,
    developer_id: Uuid,
    doc_id: Uuid,
    owner: OwnerRef,
) -> Result<()> {
    if !document_exists(conn, developer_id, doc_id).await? {
        return Err(missing_document(developer_id, doc_id));
    }
    if !owner_exists(conn, developer_id, owner).await? {
        return Err(missing_owner(developer_id, owner));
    }
    Ok(())
}

async fn drop_doc_links(
    conn: &mut SqliteConnection,
    developer_id: Uuid,
    doc_id: Uuid,
) -> Result<u64> {
    let mut removed = 0;
    for kind in [OwnerKind::User, OwnerKind::Agent] {
        let t = OwnerTable::of(kind);
        removed += sqlx::query(&format!(
            "DELETE FROM {} WHERE developer_id = ? AND doc_id = ?",
            t.links
        ))
        .bind(developer_id.to_string())
        .bind(doc_id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(db_err)?
        .rows_affected();
    }
    Ok(removed)
}

#[async_trait]
impl Store for SqliteStore {
    async fn create(&self, doc: NewDocument) -> Result<Document> {
        let chunk = prepare_new(doc)?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        if let Err(e) = insert_chunk(&mut tx, &chunk).await {
            warn!(doc_id = %chunk.doc.doc_id, index = chunk.doc.index, error = %e, "rejected chunk");
            return Err(e);
        }
        tx.commit().await.map_err(db_err)?;
        debug!(doc_id = %chunk.doc.doc_id, index = chunk.doc.index, "created chunk");
        Ok(chunk.doc)
    }

    async fn create_many(&self, docs: Vec<NewDocument>) -> Result<Vec<Document>> {
        let chunks = prepare_batch(docs)?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for chunk in &chunks {
            if let Err(e) = insert_chunk(&mut tx, chunk).await {
                warn!(doc_id = %chunk.doc.doc_id, index = chunk.doc.index, error = %e, "rejected chunk batch");
                return Err(e);
            }
        }
        tx.commit().await.map_err(db_err)?;
        debug!(count = chunks.len(), "created chunk batch");
        Ok(chunks.into_iter().map(|c| c.doc).collect())
    }

    async fn get(&self, developer_id: Uuid, doc_id: Uuid) -> Result<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE developer_id = ? AND doc_id = ? ORDER BY idx",
            CHUNK_COLUMNS
        ))
        .bind(developer_id.to_string())
        .bind(doc_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let docs = rows
            .iter()
            .map(|row| decode_chunk(row).map(|c| c.doc))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(docs)
    }

    async fn get_chunk(
        &self,
        developer_id: Uuid,
        doc_id: Uuid,
        index: i64,
    ) -> Result<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE developer_id = ? AND doc_id = ? AND idx = ?",
            CHUNK_COLUMNS
        ))
        .bind(developer_id.to_string())
        .bind(doc_id.to_string())
        .bind(index)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => Ok(Some(decode_chunk(&row)?.doc)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        developer_id: Uuid,
        doc_id: Uuid,
        index: i64,
        patch: DocumentPatch,
    ) -> Result<Document> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE developer_id = ? AND doc_id = ? AND idx = ?",
            CHUNK_COLUMNS
        ))
        .bind(developer_id.to_string())
        .bind(doc_id.to_string())
        .bind(index)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?
        .ok_or_else(|| missing_chunk(developer_id, doc_id, index))?;

        let current = decode_chunk(&row)?;
        let next = prepare_update(&current, patch)?;
        let doc = &next.doc;

        sqlx::query(
            r#"
            UPDATE documents
            SET title = ?, content = ?, language = ?, metadata_json = ?,
                search_repr = ?, updated_at = ?
            WHERE developer_id = ? AND doc_id = ? AND idx = ?
            "#,
        )
        .bind(&doc.title)
        .bind(&doc.content)
        .bind(&doc.language)
        .bind(encode_json(&doc.metadata)?)
        .bind(encode_json(&next.repr)?)
        .bind(doc.updated_at.timestamp_millis())
        .bind(developer_id.to_string())
        .bind(doc_id.to_string())
        .bind(index)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        debug!(%doc_id, index, "updated chunk");
        Ok(next.doc)
    }

    async fn delete(&self, developer_id: Uuid, doc_id: Uuid) -> Result<DeleteOutcome> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let chunks = sqlx::query("DELETE FROM documents WHERE developer_id = ? AND doc_id = ?")
            .bind(developer_id.to_string())
            .bind(doc_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?
            .rows_affected();
        if chunks == 0 {
            return Ok(DeleteOutcome::NotFound);
        }
        let links = drop_doc_links(&mut tx, developer_id, doc_id).await?;
        tx.commit().await.map_err(db_err)?;
        debug!(%doc_id, chunks, links, "deleted document");
        Ok(DeleteOutcome::Deleted { chunks, links })
    }

    async fn delete_chunk(
        &self,
        developer_id: Uuid,
        doc_id: Uuid,
        index: i64,
    ) -> Result<DeleteOutcome> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let chunks = sqlx::query(
            "DELETE FROM documents WHERE developer_id = ? AND doc_id = ? AND idx = ?",
        )
        .bind(developer_id.to_string())
        .bind(doc_id.to_string())
        .bind(index)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?
        .rows_affected();
        if chunks == 0 {
            return Ok(DeleteOutcome::NotFound);
        }
        let links = if document_exists(&mut tx, developer_id, doc_id).await? {
            0
        } else {
            drop_doc_links(&mut tx, developer_id, doc_id).await?
        };
        tx.commit().await.map_err(db_err)?;
        debug!(%doc_id, index, links, "deleted chunk");
        Ok(DeleteOutcome::Deleted { chunks, links })
    }

    async fn register_owner(&self, developer_id: Uuid, owner: OwnerRef) -> Result<()> {
        let t = OwnerTable::of(owner.kind);
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query(&format!(
            "INSERT INTO {} ({}, developer_id, created_at) VALUES (?, ?, ?) \
             ON CONFLICT({}) DO NOTHING",
            t.table, t.id_col, t.id_col
        ))
        .bind(owner.id.to_string())
        .bind(developer_id.to_string())
        .bind(Utc::now().timestamp_millis())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if !owner_exists(&mut tx, developer_id, owner).await? {
            warn!(%owner, "rejected registration under another developer");
            return Err(foreign_owner(owner));
        }
        tx.commit().await.map_err(db_err)?;
        debug!(%owner, "registered owner");
        Ok(())
    }

    async fn remove_owner(&self, developer_id: Uuid, owner: OwnerRef) -> Result<bool> {
        let t = OwnerTable::of(owner.kind);
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let removed = sqlx::query(&format!(
            "DELETE FROM {} WHERE {} = ? AND developer_id = ?",
            t.table, t.id_col
        ))
        .bind(owner.id.to_string())
        .bind(developer_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?
        .rows_affected();
        if removed == 0 {
            return Ok(false);
        }
        sqlx::query(&format!(
            "DELETE FROM {} WHERE {} = ? AND developer_id = ?",
            t.links, t.id_col
        ))
        .bind(owner.id.to_string())
        .bind(developer_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        debug!(%owner, "removed owner");
        Ok(true)
    }

    async fn link(&self, developer_id: Uuid, doc_id: Uuid, owner: OwnerRef) -> Result<()> {
        let t = OwnerTable::of(owner.kind);
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        check_link_endpoints(&mut tx, developer_id, doc_id, owner).await?;
        sqlx::query(&format!(
            "INSERT INTO {} (developer_id, {}, doc_id) VALUES (?, ?, ?) \
             ON CONFLICT({}, doc_id) DO NOTHING",
            t.links, t.id_col, t.id_col
        ))
        .bind(developer_id.to_string())
        .bind(owner.id.to_string())
        .bind(doc_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        debug!(%doc_id, %owner, "linked document");
        Ok(())
    }

    async fn unlink(&self, developer_id: Uuid, doc_id: Uuid, owner: OwnerRef) -> Result<bool> {
        let t = OwnerTable::of(owner.kind);
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        check_link_endpoints(&mut tx, developer_id, doc_id, owner).await?;
        let removed = sqlx::query(&format!(
            "DELETE FROM {} WHERE developer_id = ? AND {} = ? AND doc_id = ?",
            t.links, t.id_col
        ))
        .bind(developer_id.to_string())
        .bind(owner.id.to_string())
        .bind(doc_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?
        .rows_affected();
        tx.commit().await.map_err(db_err)?;
        Ok(removed > 0)
    }

    async fn owners_of(&self, developer_id: Uuid, doc_id: Uuid) -> Result<Vec<OwnerRef>> {
        let mut owners = Vec::new();
        for kind in [OwnerKind::User, OwnerKind::Agent] {
            let t = OwnerTable::of(kind);
            let ids: Vec<String> = sqlx::query_scalar(&format!(
                "SELECT {} FROM {} WHERE developer_id = ? AND doc_id = ? ORDER BY {}",
                t.id_col, t.links, t.id_col
            ))
            .bind(developer_id.to_string())
            .bind(doc_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
            for id in ids {
                let id = Uuid::parse_str(&id).context("invalid owner id")?;
                owners.push(OwnerRef { kind, id });
            }
        }
        Ok(owners)
    }

    async fn candidates(&self, scope: &Scope) -> Result<Vec<IndexedChunk>> {
        let developer_id = scope.developer_id.to_string();
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM documents WHERE developer_id = ",
            CHUNK_COLUMNS
        ));
        qb.push_bind(developer_id.clone());

        if !scope.owners.is_empty() {
            qb.push(" AND (");
            let mut first = true;
            for kind in [OwnerKind::User, OwnerKind::Agent] {
                let ids: Vec<String> = scope
                    .owners
                    .iter()
                    .filter(|o| o.kind == kind)
                    .map(|o| o.id.to_string())
                    .collect();
                if ids.is_empty() {
                    continue;
                }
                if !first {
                    qb.push(" OR ");
                }
                first = false;
                let t = OwnerTable::of(kind);
                qb.push(format!(
                    "doc_id IN (SELECT doc_id FROM {} WHERE developer_id = ",
                    t.links
                ));
                qb.push_bind(developer_id.clone());
                qb.push(format!(" AND {} IN (", t.id_col));
                let mut ids_list = qb.separated(", ");
                for id in ids {
                    ids_list.push_bind(id);
                }
                ids_list.push_unseparated("))");
            }
            qb.push(")");
        }
        qb.push(" ORDER BY doc_id, idx");

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;
        let chunks = rows
            .iter()
            .map(decode_chunk)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(chunks)
    }
}
