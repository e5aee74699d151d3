//! SQLite connection management.
//!
//! WAL mode lets search readers proceed while a writer commits. The busy
//! timeout makes concurrent writers wait for the lock instead of failing
//! immediately; the loser of a primary-key race still gets a unique
//! violation, which the store reports as a conflict.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a pool against the configured database file, creating it and its
/// parent directories if needed.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    connect_path(&config.db.path).await
}

pub async fn connect_path(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

    Ok(pool)
}

/// Connect and wrap the pool in a [`SqliteStore`].
pub async fn open_store(config: &Config) -> Result<SqliteStore> {
    Ok(SqliteStore::new(connect(config).await?))
}
