//! # Doc Store
//!
//! SQLite persistence, configuration and the `dstore` command-line
//! front end for the multi-tenant document store in [`doc_store_core`].
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | SQLite connection pool (WAL, busy timeout) |
//! | [`migrate`] | Idempotent schema creation |
//! | [`sqlite_store`] | [`Store`](doc_store_core::store::Store) backed by SQLite |
//! | [`ingest`] | `put`: build chunks, optionally split, store atomically |
//! | [`get`] | `get`: chunks and owners of one document |
//! | [`edit`] | `update` and `delete` |
//! | [`owners`] | Owner registration and document links |
//! | [`search`] | Ranked search with config defaults |

pub mod config;
pub mod db;
pub mod edit;
pub mod get;
pub mod ingest;
pub mod migrate;
pub mod owners;
pub mod search;
pub mod sqlite_store;

pub use doc_store_core::store;
