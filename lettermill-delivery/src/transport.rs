//! Outbound mail transport abstraction.

use async_trait::async_trait;
use lettermill_common::document::SendInfo;
use parking_lot::Mutex;

use crate::{error::TransportError, payload::DeliveryPayload};

/// Abstract outbound transport.
///
/// The contract is at-least-once: a crash between `send` returning and the
/// state commit can produce a duplicate send, and implementations must
/// tolerate being handed the same payload twice.
#[async_trait]
pub trait Mailer: Send + Sync + std::fmt::Debug {
    /// Send one prepared payload, returning the transport's acceptance
    /// report.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the send fails; partial acceptance
    /// is reported through the returned [`SendInfo`] instead.
    async fn send(&self, payload: &DeliveryPayload) -> Result<SendInfo, TransportError>;
}

/// In-memory mailer that records every payload, for development and tests.
///
/// Sends succeed and accept every recipient unless a failure has been
/// scripted with [`MemoryMailer::fail_with`].
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<DeliveryPayload>>,
    failure: Mutex<Option<TransportError>>,
}

impl MemoryMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail with `error`.
    pub fn fail_with(&self, error: TransportError) {
        *self.failure.lock() = Some(error);
    }

    /// Make subsequent sends succeed again.
    pub fn recover(&self) {
        *self.failure.lock() = None;
    }

    /// Payloads sent so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<DeliveryPayload> {
        self.sent.lock().clone()
    }

    /// Number of payloads sent so far.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, payload: &DeliveryPayload) -> Result<SendInfo, TransportError> {
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }

        self.sent.lock().push(payload.clone());

        Ok(SendInfo {
            message_id: Some(format!("<{}@lettermill.local>", ulid::Ulid::new())),
            accepted: payload.all_recipients(),
            rejected: Vec::new(),
            pending: Vec::new(),
            response: Some("250 2.0.0 OK".to_string()),
        })
    }
}
