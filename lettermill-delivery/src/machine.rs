//! The queue state machine.
//!
//! Each change-feed event is handled by one independent invocation: classify
//! the event, interpret the document's current `delivery.state`, and perform
//! zero or one atomic state transition. The store's read-modify-write is the
//! only synchronization between racing invocations for the same document;
//! the processing lease is the guard that keeps two of them from both
//! performing the send.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use chrono::{TimeDelta, Utc};
use lettermill_common::document::{Delivery, DeliveryState, QueueDocument};
use lettermill_spool::{ChangeEvent, ChangeKind, DocumentStore, QueueDocumentId};
use tracing::{debug, error, warn};

use crate::{
    error::DeliveryError,
    events::{DeliveryEvent, EventSink},
    executor::DeliveryExecutor,
};

/// How one invocation ended, used to decide completion-event emission.
enum Handling {
    Processed,
    /// Early no-op: deletion, or an update without a delivery block.
    Skipped,
}

/// Orchestrates the delivery lifecycle of queue documents.
#[derive(Debug)]
pub struct QueueStateMachine {
    store: Arc<dyn DocumentStore>,
    executor: DeliveryExecutor,
    sink: Arc<dyn EventSink>,
    lease: TimeDelta,
}

impl QueueStateMachine {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        executor: DeliveryExecutor,
        sink: Arc<dyn EventSink>,
        lease: std::time::Duration,
    ) -> Self {
        Self {
            store,
            executor,
            sink,
            lease: TimeDelta::from_std(lease).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Handle one change-feed event.
    ///
    /// This is the recovery boundary: the invocation always completes. Any
    /// failure that escapes the normal paths is recorded on the document as
    /// ERROR instead of propagating, so the change-feed host never observes
    /// a failed notification. A completion event fires on every exit path
    /// except the early no-ops for deletion and missing-delivery updates.
    pub async fn handle_change(&self, event: &ChangeEvent) {
        match self.process(event).await {
            Ok(Handling::Skipped) => {}
            Ok(Handling::Processed) => {
                self.emit(DeliveryEvent::Complete {
                    id: event.id.clone(),
                });
            }
            Err(failure) => {
                error!(document = %event.id, error = %failure, "Delivery processing failed");
                self.record_unhandled(&event.id, &failure).await;
                self.emit(DeliveryEvent::Complete {
                    id: event.id.clone(),
                });
            }
        }
    }

    async fn process(&self, event: &ChangeEvent) -> Result<Handling, DeliveryError> {
        match event.kind() {
            ChangeKind::Deleted => Ok(Handling::Skipped),
            ChangeKind::Created => {
                self.emit(DeliveryEvent::Start {
                    id: event.id.clone(),
                });
                self.initialize(&event.id).await?;
                Ok(Handling::Processed)
            }
            ChangeKind::Updated => {
                let Some(after) = &event.after else {
                    return Ok(Handling::Skipped);
                };
                let Some(delivery) = &after.delivery else {
                    warn!(document = %event.id, "Queue document has no delivery state, ignoring");
                    return Ok(Handling::Skipped);
                };

                self.emit(DeliveryEvent::Start {
                    id: event.id.clone(),
                });

                match delivery.state {
                    DeliveryState::Pending => self.on_pending(event, after).await?,
                    DeliveryState::Retry => self.on_retry(event, after).await?,
                    DeliveryState::Processing => self.on_processing(event, delivery).await?,
                    DeliveryState::Success => self.on_success(event, delivery),
                    DeliveryState::Error => self.on_error(event, delivery),
                }

                Ok(Handling::Processed)
            }
        }
    }

    /// Stamp a fresh PENDING delivery block onto a just-created document.
    ///
    /// The follow-up change event carries the PENDING state and kicks off the
    /// first attempt.
    async fn initialize(&self, id: &QueueDocumentId) -> Result<(), DeliveryError> {
        let now = Utc::now();
        self.store
            .with_document(
                id,
                Box::new(move |document| {
                    document.delivery = Some(Delivery::pending(now));
                }),
            )
            .await?;
        debug!(document = %id, "Queued new document");
        Ok(())
    }

    /// A PENDING document is logically "ready to attempt": record the pending
    /// observation, then take the retry path. The shared path keeps lease
    /// acquisition in one place and makes the first attempt emit the same
    /// event sequence a retry does.
    async fn on_pending(
        &self,
        event: &ChangeEvent,
        after: &QueueDocument,
    ) -> Result<(), DeliveryError> {
        self.emit(DeliveryEvent::Pending {
            id: event.id.clone(),
        });
        self.on_retry(event, after).await
    }

    /// Claim the processing lease and run one delivery attempt.
    async fn on_retry(
        &self,
        event: &ChangeEvent,
        after: &QueueDocument,
    ) -> Result<(), DeliveryError> {
        self.emit(DeliveryEvent::Retry {
            id: event.id.clone(),
        });

        let expiry = Utc::now() + self.lease;
        let mut claimed = false;

        {
            let claimed = &mut claimed;
            self.store
                .with_document(
                    &event.id,
                    Box::new(move |document| {
                        // Re-check under the lock: a racing invocation may
                        // already own the document.
                        if let Some(delivery) = document.delivery.as_mut()
                            && matches!(
                                delivery.state,
                                DeliveryState::Pending | DeliveryState::Retry
                            )
                        {
                            delivery.state = DeliveryState::Processing;
                            delivery.lease_expire_time = Some(expiry);
                            *claimed = true;
                        }
                    }),
                )
                .await?;
        }

        if !claimed {
            debug!(document = %event.id, "Another attempt already owns this document, skipping");
            return Ok(());
        }

        self.deliver(&event.id, after).await
    }

    /// Run the attempt and commit its outcome in one transaction.
    async fn deliver(
        &self,
        id: &QueueDocumentId,
        after: &QueueDocument,
    ) -> Result<(), DeliveryError> {
        let update = self.executor.execute(id, after).await;
        let end_time = Utc::now();

        self.store
            .with_document(
                id,
                Box::new(move |document| {
                    if let Some(delivery) = document.delivery.as_mut() {
                        delivery.attempts += 1;
                        delivery.end_time = Some(end_time);
                        delivery.lease_expire_time = None;
                        delivery.state = update.state;
                        delivery.error = update.error;
                        delivery.info = update.info;
                    }
                }),
            )
            .await?;

        Ok(())
    }

    /// Another invocation owns the document unless its lease has expired.
    async fn on_processing(
        &self,
        event: &ChangeEvent,
        delivery: &Delivery,
    ) -> Result<(), DeliveryError> {
        let now = Utc::now();

        if !delivery.lease_expired(now) {
            self.emit(DeliveryEvent::Processing {
                id: event.id.clone(),
            });
            return Ok(());
        }

        // The owning worker is presumed crashed or hung. This is surfaced as
        // an error, not silently retried.
        let expired_at = delivery.lease_expire_time.unwrap_or(now);
        let failure = DeliveryError::LeaseExpired { expired_at };
        warn!(
            document = %event.id,
            expired_at = %expired_at,
            "Processing lease expired, marking document failed"
        );
        self.emit(DeliveryEvent::Error {
            id: event.id.clone(),
            error: Some(failure.to_string()),
        });

        let message = failure.to_string();
        self.store
            .with_document(
                &event.id,
                Box::new(move |document| {
                    if let Some(delivery) = document.delivery.as_mut()
                        && delivery.state == DeliveryState::Processing
                    {
                        delivery.state = DeliveryState::Error;
                        delivery.error = Some(message);
                        delivery.lease_expire_time = None;
                    }
                }),
            )
            .await?;

        Ok(())
    }

    /// Terminal success: record the success event, then the terminal
    /// error-record emission with no error attached. Downstream consumers
    /// receive both; the pair is part of the event contract.
    fn on_success(&self, event: &ChangeEvent, delivery: &Delivery) {
        self.emit(DeliveryEvent::Success {
            id: event.id.clone(),
            info: delivery.info.clone(),
        });
        self.emit_error_record(event, None);
    }

    /// Terminal error: record the terminal error event.
    fn on_error(&self, event: &ChangeEvent, delivery: &Delivery) {
        self.emit_error_record(event, delivery.error.clone());
    }

    /// Shared terminal error-event recording step.
    fn emit_error_record(&self, event: &ChangeEvent, error: Option<String>) {
        self.emit(DeliveryEvent::Error {
            id: event.id.clone(),
            error,
        });
    }

    /// Best-effort ERROR commit for failures that escaped the normal paths.
    async fn record_unhandled(&self, id: &QueueDocumentId, failure: &DeliveryError) {
        let message = format!("unhandled error occurred during processing: {failure}");
        self.emit(DeliveryEvent::Error {
            id: id.clone(),
            error: Some(message.clone()),
        });

        if let Err(store_error) = self
            .store
            .with_document(
                id,
                Box::new(move |document| {
                    if let Some(delivery) = document.delivery.as_mut() {
                        delivery.state = DeliveryState::Error;
                        delivery.error = Some(message);
                        delivery.lease_expire_time = None;
                    }
                }),
            )
            .await
        {
            error!(
                document = %id,
                error = %store_error,
                "Failed to record unhandled processing error"
            );
        }
    }

    /// Fire an observer hook. Observer failures never reach the pipeline.
    fn emit(&self, event: DeliveryEvent) {
        let sink = Arc::clone(&self.sink);
        if catch_unwind(AssertUnwindSafe(move || sink.emit(event))).is_err() {
            warn!("Event sink panicked, continuing");
        }
    }
}
