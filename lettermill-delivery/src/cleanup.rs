//! Retention sweep for terminal queue documents.

use chrono::{TimeDelta, Utc};
use lettermill_spool::{DocumentStore, SpoolError};
use tracing::debug;

use crate::error::DeliveryError;

/// Delete SUCCESS/ERROR documents whose delivery finished more than
/// `retention` ago.
///
/// Documents without an end timestamp (for example those failed through
/// lease expiry) age from their start timestamp instead. Returns the number
/// of documents removed; a document deleted concurrently is not counted.
///
/// # Errors
///
/// Returns an error if the store cannot be read or a deletion fails.
pub async fn sweep_terminal(
    store: &dyn DocumentStore,
    retention: std::time::Duration,
) -> Result<usize, DeliveryError> {
    let now = Utc::now();
    let retention = TimeDelta::from_std(retention).unwrap_or(TimeDelta::MAX);
    let mut removed = 0;

    for id in store.list().await? {
        let Ok(document) = store.get(&id).await else {
            continue;
        };
        let Some(delivery) = &document.delivery else {
            continue;
        };
        if !delivery.state.is_terminal() {
            continue;
        }

        let finished_at = delivery.end_time.unwrap_or(delivery.start_time);
        if now.signed_duration_since(finished_at) <= retention {
            continue;
        }

        match store.delete(&id).await {
            Ok(()) => {
                debug!(document = %id, state = %delivery.state, "Swept terminal document");
                removed += 1;
            }
            Err(SpoolError::NotFound(_)) => {}
            Err(error) => return Err(error.into()),
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lettermill_common::document::{Delivery, DeliveryState, QueueDocument};
    use lettermill_spool::MemoryDocumentStore;
    use pretty_assertions::assert_eq;

    use super::*;

    async fn seed(
        store: &MemoryDocumentStore,
        state: DeliveryState,
        age: TimeDelta,
    ) -> lettermill_spool::QueueDocumentId {
        let now = Utc::now();
        let mut delivery = Delivery::pending(now - age);
        delivery.state = state;
        delivery.end_time = Some(now - age);

        let mut document = QueueDocument::default().with_to("a@x.com");
        document.delivery = Some(delivery);
        store.create(document).await.expect("Failed to seed store")
    }

    #[tokio::test]
    async fn test_sweep_removes_only_old_terminal_documents() {
        let store = Arc::new(MemoryDocumentStore::new());

        let old_success = seed(&store, DeliveryState::Success, TimeDelta::hours(48)).await;
        let old_error = seed(&store, DeliveryState::Error, TimeDelta::hours(48)).await;
        let fresh_success = seed(&store, DeliveryState::Success, TimeDelta::minutes(5)).await;
        let old_pending = seed(&store, DeliveryState::Pending, TimeDelta::hours(48)).await;

        let removed = sweep_terminal(store.as_ref(), std::time::Duration::from_secs(86400))
            .await
            .expect("Sweep should succeed");

        assert_eq!(removed, 2);
        assert!(store.get(&old_success).await.is_err());
        assert!(store.get(&old_error).await.is_err());
        assert!(store.get(&fresh_success).await.is_ok());
        assert!(store.get(&old_pending).await.is_ok());
    }

    #[tokio::test]
    async fn test_sweep_uses_start_time_when_end_time_is_missing() {
        let store = Arc::new(MemoryDocumentStore::new());

        // Lease-expired documents carry no end timestamp
        let mut delivery = Delivery::pending(Utc::now() - TimeDelta::hours(48));
        delivery.state = DeliveryState::Error;
        delivery.error = Some("delivery lease expired".to_string());
        let mut document = QueueDocument::default().with_to("a@x.com");
        document.delivery = Some(delivery);
        let id = store.create(document).await.expect("Failed to seed store");

        let removed = sweep_terminal(store.as_ref(), std::time::Duration::from_secs(86400))
            .await
            .expect("Sweep should succeed");

        assert_eq!(removed, 1);
        assert!(store.get(&id).await.is_err());
    }

    #[tokio::test]
    async fn test_sweep_on_empty_store_removes_nothing() {
        let store = MemoryDocumentStore::new();
        let removed = sweep_terminal(&store, std::time::Duration::from_secs(60))
            .await
            .expect("Sweep should succeed");
        assert_eq!(removed, 0);
    }
}
