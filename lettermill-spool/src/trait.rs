//! Storage abstraction for queue documents.

use async_trait::async_trait;
use lettermill_common::document::QueueDocument;

use crate::{error::Result, types::QueueDocumentId};

/// Closure applied to a document inside [`DocumentStore::with_document`].
///
/// The closure runs while the store holds its write lock for the target
/// document, so it must be cheap and must not block. Results are communicated
/// back to the caller through captured state.
pub type TransactionFn<'a> = Box<dyn FnOnce(&mut QueueDocument) + Send + 'a>;

/// Abstract transactional key-document store backing the mail queue.
///
/// The store owns every document; callers never hold a long-lived reference.
/// `with_document` is the single concurrency-correctness primitive: it
/// serializes read-modify-write against one document, so transitions on the
/// same document are linearizable while different documents stay fully
/// independent.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Insert a new document and return its generated identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be stored.
    async fn create(&self, document: QueueDocument) -> Result<QueueDocumentId>;

    /// Read one document by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SpoolError::NotFound`] if the document does not exist.
    async fn get(&self, id: &QueueDocumentId) -> Result<QueueDocument>;

    /// Atomically read-modify-write one document.
    ///
    /// The closure observes the current document state and may mutate it; the
    /// read and the write together form a single linearizable step with
    /// respect to every other store operation on the same document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SpoolError::NotFound`] if the document does not exist.
    async fn with_document(&self, id: &QueueDocumentId, apply: TransactionFn<'_>) -> Result<()>;

    /// Delete one document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SpoolError::NotFound`] if the document does not exist.
    async fn delete(&self, id: &QueueDocumentId) -> Result<()>;

    /// List all document identifiers, sorted by creation time.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn list(&self) -> Result<Vec<QueueDocumentId>>;
}
