//! The queue document model: one document per mail-send request.
//!
//! Field names follow the watched collection's wire form (camelCase), so
//! documents written by existing producers decode without translation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{message::MessageContent, recipients::AddressField};

/// Delivery lifecycle state of a queue document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryState {
    Pending,
    Processing,
    Retry,
    Success,
    Error,
}

impl DeliveryState {
    /// Terminal states never transition further on their own.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

impl std::fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Retry => "RETRY",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Transport acceptance report recorded on a delivered document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendInfo {
    pub message_id: Option<String>,
    pub accepted: Vec<String>,
    pub rejected: Vec<String>,
    pub pending: Vec<String>,
    pub response: Option<String>,
}

/// Mutable delivery-state block stamped onto every queue document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub state: DeliveryState,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub info: Option<SendInfo>,
    /// Expiry of the processing lease. Non-None only while PROCESSING.
    #[serde(default)]
    pub lease_expire_time: Option<DateTime<Utc>>,
}

impl Delivery {
    /// Fresh delivery block for a just-created document.
    #[must_use]
    pub const fn pending(now: DateTime<Utc>) -> Self {
        Self {
            state: DeliveryState::Pending,
            start_time: now,
            end_time: None,
            attempts: 0,
            error: None,
            info: None,
            lease_expire_time: None,
        }
    }

    /// Whether the processing lease has expired as of `now`.
    ///
    /// A document without a lease is never considered expired.
    #[must_use]
    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        self.lease_expire_time.is_some_and(|expiry| expiry < now)
    }
}

/// Optional template reference on a queue document.
///
/// `name` is decoded as optional so a malformed reference can be reported as
/// a validation failure rather than a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateSpec {
    pub name: Option<String>,
    pub data: Option<serde_json::Value>,
}

/// One record in the watched collection: a single mail-send request and its
/// delivery status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueDocument {
    pub message: Option<MessageContent>,
    pub template: Option<TemplateSpec>,
    pub to: Option<AddressField>,
    pub cc: Option<AddressField>,
    pub bcc: Option<AddressField>,
    pub to_uids: Option<Vec<String>>,
    pub cc_uids: Option<Vec<String>>,
    pub bcc_uids: Option<Vec<String>>,
    pub from: Option<String>,
    pub reply_to: Option<String>,
    pub headers: HashMap<String, String>,
    pub delivery: Option<Delivery>,
}

impl QueueDocument {
    /// Decode a raw document value, surfacing shape errors at the boundary.
    ///
    /// # Errors
    ///
    /// Returns the decode error when any field has the wrong shape (for
    /// example a numeric `to` field).
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Current delivery state, if the delivery block has been stamped.
    #[must_use]
    pub fn state(&self) -> Option<DeliveryState> {
        self.delivery.as_ref().map(|delivery| delivery.state)
    }

    /// Whether any uid-based recipient field is present.
    #[must_use]
    pub fn uses_uids(&self) -> bool {
        self.to_uids.is_some() || self.cc_uids.is_some() || self.bcc_uids.is_some()
    }

    #[must_use]
    pub fn with_message(mut self, message: MessageContent) -> Self {
        self.message = Some(message);
        self
    }

    #[must_use]
    pub fn with_template(mut self, template: TemplateSpec) -> Self {
        self.template = Some(template);
        self
    }

    #[must_use]
    pub fn with_to(mut self, to: impl Into<AddressField>) -> Self {
        self.to = Some(to.into());
        self
    }

    #[must_use]
    pub fn with_to_uids(mut self, uids: Vec<String>) -> Self {
        self.to_uids = Some(uids);
        self
    }

    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_delivery_state_display_matches_wire_form() {
        assert_eq!(DeliveryState::Pending.to_string(), "PENDING");
        assert_eq!(DeliveryState::Error.to_string(), "ERROR");
        assert_eq!(
            serde_json::to_value(DeliveryState::Processing).expect("Failed to encode"),
            serde_json::json!("PROCESSING")
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(DeliveryState::Success.is_terminal());
        assert!(DeliveryState::Error.is_terminal());
        assert!(!DeliveryState::Pending.is_terminal());
        assert!(!DeliveryState::Processing.is_terminal());
        assert!(!DeliveryState::Retry.is_terminal());
    }

    #[test]
    fn test_fresh_delivery_block() {
        let now = Utc::now();
        let delivery = Delivery::pending(now);
        assert_eq!(delivery.state, DeliveryState::Pending);
        assert_eq!(delivery.attempts, 0);
        assert_eq!(delivery.error, None);
        assert_eq!(delivery.lease_expire_time, None);
    }

    #[test]
    fn test_lease_expiry() {
        let now = Utc::now();
        let mut delivery = Delivery::pending(now);

        // No lease, never expired
        assert!(!delivery.lease_expired(now));

        delivery.lease_expire_time = Some(now + TimeDelta::seconds(60));
        assert!(!delivery.lease_expired(now));

        delivery.lease_expire_time = Some(now - TimeDelta::seconds(1));
        assert!(delivery.lease_expired(now));
    }

    #[test]
    fn test_document_decodes_wire_field_names() {
        let document = QueueDocument::from_value(serde_json::json!({
            "to": "a@x.com",
            "toUids": ["u1"],
            "replyTo": "support@x.com",
            "message": { "subject": "hi" }
        }))
        .expect("Failed to decode document");

        assert_eq!(document.to_uids, Some(vec!["u1".to_string()]));
        assert_eq!(document.reply_to.as_deref(), Some("support@x.com"));
        assert!(document.uses_uids());
        assert_eq!(document.state(), None);
    }

    #[test]
    fn test_document_rejects_invalid_recipient_shape() {
        let result = QueueDocument::from_value(serde_json::json!({ "to": 42 }));
        assert!(result.is_err());
    }

    #[test]
    fn test_delivery_round_trip_keeps_lease_field_name() {
        let now = Utc::now();
        let mut delivery = Delivery::pending(now);
        delivery.state = DeliveryState::Processing;
        delivery.lease_expire_time = Some(now);

        let value = serde_json::to_value(&delivery).expect("Failed to encode");
        assert!(value.get("leaseExpireTime").is_some());
        assert_eq!(value["state"], serde_json::json!("PROCESSING"));

        let decoded: Delivery = serde_json::from_value(value).expect("Failed to decode");
        assert_eq!(decoded, delivery);
    }
}
