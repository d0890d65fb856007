//! Observer hooks fired on delivery state transitions.
//!
//! Events are strictly best-effort bookkeeping for external consumers
//! (audit trails, notifications, dashboards). A sink that panics is caught
//! and logged; it can never change a delivery outcome.

use lettermill_common::document::SendInfo;
use lettermill_spool::QueueDocumentId;
use parking_lot::Mutex;

/// A state-transition notification for one queue document.
///
/// Within one document the emission order is contractual; across documents
/// no ordering is guaranteed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryEvent {
    /// An invocation started handling the document.
    Start { id: QueueDocumentId },
    /// The document was observed in PENDING.
    Pending { id: QueueDocumentId },
    /// The document was observed in PROCESSING with an unexpired lease.
    Processing { id: QueueDocumentId },
    /// A delivery attempt is about to begin.
    Retry { id: QueueDocumentId },
    /// The document reached SUCCESS.
    Success {
        id: QueueDocumentId,
        info: Option<SendInfo>,
    },
    /// Terminal error recording. `error` is `None` for the bookkeeping
    /// emission that follows every success.
    Error {
        id: QueueDocumentId,
        error: Option<String>,
    },
    /// The invocation finished handling the document.
    Complete { id: QueueDocumentId },
}

impl DeliveryEvent {
    /// The document this event belongs to.
    #[must_use]
    pub const fn document_id(&self) -> &QueueDocumentId {
        match self {
            Self::Start { id }
            | Self::Pending { id }
            | Self::Processing { id }
            | Self::Retry { id }
            | Self::Success { id, .. }
            | Self::Error { id, .. }
            | Self::Complete { id } => id,
        }
    }
}

/// Best-effort observer of delivery events.
///
/// Implementations must be cheap and non-blocking; hand expensive work off
/// to a channel or task.
pub trait EventSink: Send + Sync + std::fmt::Debug {
    fn emit(&self, event: DeliveryEvent);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: DeliveryEvent) {}
}

/// Sink that records events in emission order, for tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<DeliveryEvent>>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event emitted so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<DeliveryEvent> {
        self.events.lock().clone()
    }

    /// Events emitted for one document, in order.
    #[must_use]
    pub fn for_document(&self, id: &QueueDocumentId) -> Vec<DeliveryEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.document_id() == id)
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: DeliveryEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        let id = QueueDocumentId::generate();

        sink.emit(DeliveryEvent::Start { id: id.clone() });
        sink.emit(DeliveryEvent::Pending { id: id.clone() });
        sink.emit(DeliveryEvent::Complete { id: id.clone() });

        assert_eq!(
            sink.events(),
            vec![
                DeliveryEvent::Start { id: id.clone() },
                DeliveryEvent::Pending { id: id.clone() },
                DeliveryEvent::Complete { id },
            ]
        );
    }

    #[test]
    fn test_for_document_filters_other_documents() {
        let sink = CollectingSink::new();
        let a = QueueDocumentId::generate();
        let b = QueueDocumentId::generate();

        sink.emit(DeliveryEvent::Start { id: a.clone() });
        sink.emit(DeliveryEvent::Start { id: b });

        assert_eq!(sink.for_document(&a).len(), 1);
    }
}
