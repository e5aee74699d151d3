//! # Doc Store Core
//!
//! Storage-agnostic logic for the multi-tenant document store: the
//! language registry, data models, search-representation derivation, the
//! [`store::Store`] abstraction with an in-memory backend, and the ranked
//! query engine.
//!
//! This crate does no filesystem or database I/O. The `doc-store` crate
//! supplies the SQLite backend, configuration and CLI.

pub mod chunk;
pub mod error;
pub mod index;
pub mod lang;
pub mod models;
pub mod search;
pub mod store;
mod stopwords;

pub use error::{Result, StoreError};
