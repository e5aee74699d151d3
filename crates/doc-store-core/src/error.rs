//! Error taxonomy shared by every [`Store`](crate::store::Store) backend.
//!
//! Failures are scoped to the call that produced them: a rejected write
//! leaves previously committed state untouched.

use thiserror::Error;

/// Errors surfaced by document store and query operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Malformed input. Never retried.
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Duplicate primary key or a lost write race. The caller may retry
    /// after a fresh read.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The record an operation targets does not exist in the caller's scope.
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend failure (I/O, driver, corrupt row).
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StoreError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        StoreError::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        StoreError::NotFound(message.into())
    }

    /// Only conflicts are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }

    /// Name of the offending field for validation errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            StoreError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
