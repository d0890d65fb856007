use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use lettermill_common::document::QueueDocument;
use tokio::sync::broadcast;
use tracing::trace;

use crate::{
    SpoolError,
    change::ChangeEvent,
    r#trait::{DocumentStore, TransactionFn},
    types::QueueDocumentId,
};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// In-memory document store implementation
///
/// Documents live in a `HashMap` protected by an `RwLock`; transactions hold
/// the write lock for the duration of the closure, which gives linearizable
/// read-modify-write per document. Primarily intended for development and
/// testing.
///
/// # Change feed
/// Every create/update/delete publishes a [`ChangeEvent`] on a broadcast
/// channel obtained through [`MemoryDocumentStore::subscribe`]. A transaction
/// that leaves the document unchanged publishes nothing, so a processor
/// consuming its own writes cannot loop on no-op commits.
///
/// # Capacity Management
/// The store can be configured with a maximum capacity. When capacity is
/// reached, `create` fails with an error.
#[derive(Debug, Clone)]
pub struct MemoryDocumentStore {
    documents: Arc<RwLock<HashMap<QueueDocumentId, QueueDocument>>>,
    /// Maximum number of documents to store (None = unlimited)
    capacity: Option<usize>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl MemoryDocumentStore {
    /// Create a new empty store with unlimited capacity
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
            capacity: None,
            changes,
        }
    }

    /// Create a new store with a capacity limit
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new()
        }
    }

    /// Subscribe to the change feed
    ///
    /// Slow subscribers can lag; lagged receivers observe a
    /// [`broadcast::error::RecvError::Lagged`] and continue from the oldest
    /// retained event.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    /// Get the current number of documents in the store
    ///
    /// Recovers gracefully if the lock is poisoned by accessing the
    /// underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the configured capacity (None = unlimited)
    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    fn publish(&self, event: ChangeEvent) {
        // No receivers is fine; the feed is optional.
        let _ = self.changes.send(event);
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, document: QueueDocument) -> crate::Result<QueueDocumentId> {
        let id = QueueDocumentId::generate();

        {
            let mut documents = self.documents.write()?;

            if let Some(capacity) = self.capacity
                && documents.len() >= capacity
            {
                return Err(SpoolError::CapacityExceeded {
                    len: documents.len(),
                    capacity,
                });
            }

            documents.insert(id.clone(), document.clone());
        }

        trace!(document = %id, "Created queue document");
        self.publish(ChangeEvent::created(id.clone(), document));

        Ok(id)
    }

    async fn get(&self, id: &QueueDocumentId) -> crate::Result<QueueDocument> {
        self.documents
            .read()?
            .get(id)
            .cloned()
            .ok_or_else(|| SpoolError::NotFound(id.clone()))
    }

    async fn with_document(
        &self,
        id: &QueueDocumentId,
        apply: TransactionFn<'_>,
    ) -> crate::Result<()> {
        let event = {
            let mut documents = self.documents.write()?;
            let document = documents
                .get_mut(id)
                .ok_or_else(|| SpoolError::NotFound(id.clone()))?;

            let before = document.clone();
            apply(document);

            if *document == before {
                None
            } else {
                Some(ChangeEvent::updated(id.clone(), before, document.clone()))
            }
        };

        if let Some(event) = event {
            self.publish(event);
        }

        Ok(())
    }

    async fn delete(&self, id: &QueueDocumentId) -> crate::Result<()> {
        let before = self
            .documents
            .write()?
            .remove(id)
            .ok_or_else(|| SpoolError::NotFound(id.clone()))?;

        trace!(document = %id, "Deleted queue document");
        self.publish(ChangeEvent::deleted(id.clone(), before));

        Ok(())
    }

    async fn list(&self) -> crate::Result<Vec<QueueDocumentId>> {
        let mut ids: Vec<_> = self.documents.read()?.keys().cloned().collect();

        // ULIDs are lexicographically sortable by creation time
        ids.sort();

        Ok(ids)
    }
}
