//! Delivery execution: run one attempt end to end and capture the outcome.

use std::sync::Arc;

use lettermill_common::document::{DeliveryState, QueueDocument, SendInfo};
use lettermill_spool::QueueDocumentId;
use tracing::{info, warn};

use crate::{error::DeliveryError, payload::PayloadPreparer, transport::Mailer};

/// The state update one delivery attempt produces.
///
/// The machine applies it in a single transaction together with the attempt
/// counter increment and the end timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate {
    pub state: DeliveryState,
    pub error: Option<String>,
    pub info: Option<SendInfo>,
}

impl StateUpdate {
    /// Update for a successful send.
    #[must_use]
    pub const fn succeeded(info: SendInfo) -> Self {
        Self {
            state: DeliveryState::Success,
            error: None,
            info: Some(info),
        }
    }

    /// Update for a failed attempt, recording the stringified failure.
    #[must_use]
    pub fn failed(error: &DeliveryError) -> Self {
        Self {
            state: DeliveryState::Error,
            error: Some(error.to_string()),
            info: None,
        }
    }
}

/// Runs a single delivery attempt: prepare the payload, invoke the mailer,
/// capture the result or failure.
///
/// The executor never lets a failure escape: preparation errors,
/// zero-recipient errors, and transport errors all become an ERROR update.
#[derive(Debug, Clone)]
pub struct DeliveryExecutor {
    preparer: PayloadPreparer,
    mailer: Arc<dyn Mailer>,
}

impl DeliveryExecutor {
    #[must_use]
    pub const fn new(preparer: PayloadPreparer, mailer: Arc<dyn Mailer>) -> Self {
        Self { preparer, mailer }
    }

    /// Execute one attempt for `document` and produce its state update.
    pub async fn execute(&self, id: &QueueDocumentId, document: &QueueDocument) -> StateUpdate {
        match self.attempt(document).await {
            Ok(info) => {
                info!(
                    document = %id,
                    accepted = info.accepted.len(),
                    rejected = info.rejected.len(),
                    "Delivery succeeded"
                );
                StateUpdate::succeeded(info)
            }
            Err(error) => {
                warn!(document = %id, error = %error, "Delivery failed");
                StateUpdate::failed(&error)
            }
        }
    }

    async fn attempt(&self, document: &QueueDocument) -> Result<SendInfo, DeliveryError> {
        let payload = self.preparer.prepare(document).await?;
        Ok(self.mailer.send(&payload).await?)
    }
}
