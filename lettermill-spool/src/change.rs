//! Change-feed events emitted by document stores.

use lettermill_common::document::QueueDocument;

use crate::QueueDocumentId;

/// Before/after snapshot pair for one write to the watched collection.
///
/// Exactly one event is delivered per create/update/delete. Snapshots are
/// by-value: the receiver observes the document as it was at commit time,
/// not a live reference.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub id: QueueDocumentId,
    pub before: Option<QueueDocument>,
    pub after: Option<QueueDocument>,
}

/// Classification of a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeEvent {
    /// Event for a freshly created document.
    #[must_use]
    pub const fn created(id: QueueDocumentId, after: QueueDocument) -> Self {
        Self {
            id,
            before: None,
            after: Some(after),
        }
    }

    /// Event for an update to an existing document.
    #[must_use]
    pub const fn updated(id: QueueDocumentId, before: QueueDocument, after: QueueDocument) -> Self {
        Self {
            id,
            before: Some(before),
            after: Some(after),
        }
    }

    /// Event for a deleted document.
    #[must_use]
    pub const fn deleted(id: QueueDocumentId, before: QueueDocument) -> Self {
        Self {
            id,
            before: Some(before),
            after: None,
        }
    }

    /// Classify this event from the presence of its snapshots.
    #[must_use]
    pub const fn kind(&self) -> ChangeKind {
        match (&self.before, &self.after) {
            (None, Some(_)) => ChangeKind::Created,
            (Some(_), Some(_)) => ChangeKind::Updated,
            (_, None) => ChangeKind::Deleted,
        }
    }
}
