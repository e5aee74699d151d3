use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::info;

/// Create all tables and indexes. Safe to run repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // One row per chunk; `search_repr` holds the derived representation
    // as JSON and is rewritten in the same statement as the fields it
    // depends on.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            developer_id TEXT NOT NULL,
            doc_id TEXT NOT NULL,
            idx INTEGER NOT NULL CHECK (idx >= 0),
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            modality TEXT NOT NULL CHECK (modality IN ('text', 'image', 'mixed')),
            embedding_model TEXT NOT NULL,
            embedding_dimensions INTEGER NOT NULL CHECK (embedding_dimensions > 0),
            language TEXT NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            search_repr TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (doc_id, idx)
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create documents table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_documents_developer ON documents(developer_id)",
    )
    .execute(pool)
    .await?;

    for (table, id_col) in [("users", "user_id"), ("agents", "agent_id")] {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                {id_col} TEXT PRIMARY KEY,
                developer_id TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#
        ))
        .execute(pool)
        .await
        .with_context(|| format!("Failed to create {} table", table))?;
    }

    for (table, id_col, owner_table) in [
        ("user_docs", "user_id", "users"),
        ("agent_docs", "agent_id", "agents"),
    ] {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                developer_id TEXT NOT NULL,
                {id_col} TEXT NOT NULL,
                doc_id TEXT NOT NULL,
                PRIMARY KEY ({id_col}, doc_id),
                FOREIGN KEY ({id_col}) REFERENCES {owner_table}({id_col}) ON DELETE CASCADE
            )
            "#
        ))
        .execute(pool)
        .await
        .with_context(|| format!("Failed to create {} table", table))?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_doc ON {table}(developer_id, doc_id)"
        ))
        .execute(pool)
        .await?;
    }

    info!("schema ready");
    Ok(())
}
