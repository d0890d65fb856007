//! Error types for the lettermill-spool crate.

use thiserror::Error;

use crate::QueueDocumentId;

/// Top-level spool error type.
///
/// All store operations return this error type.
#[derive(Debug, Error)]
pub enum SpoolError {
    /// Document not found in the store.
    #[error("Document not found: {0}")]
    NotFound(QueueDocumentId),

    /// Document already exists in the store.
    #[error("Document already exists: {0}")]
    AlreadyExists(QueueDocumentId),

    /// Store capacity exceeded.
    #[error("Store capacity exceeded: {len}/{capacity} documents")]
    CapacityExceeded { len: usize, capacity: usize },

    /// Internal error (lock poisoning, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Specialized `Result` type for store operations.
pub type Result<T> = std::result::Result<T, SpoolError>;

// Convenience conversion for lock poisoning
impl<T> From<std::sync::PoisonError<T>> for SpoolError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("Lock poisoned: {e}"))
    }
}
