//! Error types for document store operations.

use thiserror::Error;

/// Errors returned by a [`crate::DocumentStore`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Update targeted a document that does not exist.
    #[error("No document to update: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Query the backend refuses to run.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Transport or service failure.
    #[error("{0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
