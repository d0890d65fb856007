//! Typed error handling for delivery operations.
//!
//! This module provides structured error types that distinguish between:
//! - Validation failures (bad document shape) - terminal, never retried
//!   automatically
//! - Resolution failures (directory or template lookups)
//! - Transport failures (the send itself)
//! - Lease expiry (stuck-worker detection)

use chrono::{DateTime, Utc};
use lettermill_spool::SpoolError;
use thiserror::Error;

/// Top-level delivery error type.
///
/// Every kind is caught at the state-machine boundary and converted into a
/// document-state commit plus an event emission; none propagate to the
/// change-feed host.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Document shape is invalid. Terminal for the document.
    #[error("Validation failure: {0}")]
    Validation(#[from] ValidationError),

    /// A directory or template lookup failed. Terminal for the document.
    #[error("Resolution failure: {0}")]
    Resolution(#[from] ResolutionError),

    /// The outbound transport rejected or failed the send.
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    /// A PROCESSING document's lease ran out: the owning worker is presumed
    /// crashed or hung.
    #[error("Delivery lease expired at {expired_at}")]
    LeaseExpired { expired_at: DateTime<Utc> },

    /// The document store failed.
    #[error("Store error: {0}")]
    Spool(#[from] SpoolError),
}

impl DeliveryError {
    /// Returns `true` for document-shape failures.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns `true` for directory/template lookup failures.
    #[must_use]
    pub const fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution(_))
    }

    /// Returns `true` for transport failures.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Document-shape failures detected before any external call.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A template was requested but carries no name.
    #[error("Template requested without a name")]
    TemplateMissingName,

    /// A template was requested but no renderer is configured.
    #[error("Template requested but no template renderer is configured")]
    TemplatesNotConfigured,

    /// Uid recipients were requested but no user directory is configured.
    #[error("Uid recipients requested but no user directory is configured")]
    UidsWithoutDirectory,

    /// A recipient field contains an invalid entry.
    #[error("Invalid {field} field: {reason}")]
    InvalidRecipients {
        field: &'static str,
        reason: String,
    },

    /// All recipient lists came out empty after resolution.
    #[error("Message has zero recipients after resolution")]
    NoRecipients,
}

/// Failures while resolving external inputs (templates, user directory).
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The named template does not exist.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// The template exists but failed to render.
    #[error("Template {name} failed to render: {reason}")]
    RenderFailed { name: String, reason: String },

    /// The user directory could not be queried.
    #[error("User directory lookup failed: {0}")]
    DirectoryUnavailable(String),
}

/// Failures reported by the outbound transport.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Failed to establish a connection to the transport.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Transport authentication failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The transport rejected one or more recipients.
    #[error("Recipients rejected: {}", rejected.join(", "))]
    RecipientsRejected { rejected: Vec<String> },

    /// Any other send failure, recorded with the transport's message.
    #[error("Send failed: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_error_predicates() {
        let error = DeliveryError::Validation(ValidationError::NoRecipients);
        assert!(error.is_validation());
        assert!(!error.is_resolution());
        assert!(!error.is_transport());

        let error = DeliveryError::Transport(TransportError::Connection(
            "connection refused".to_string(),
        ));
        assert!(error.is_transport());
    }

    #[test]
    fn test_validation_error_display() {
        assert_eq!(
            ValidationError::TemplateMissingName.to_string(),
            "Template requested without a name"
        );
        assert_eq!(
            ValidationError::InvalidRecipients {
                field: "to",
                reason: "empty address".to_string(),
            }
            .to_string(),
            "Invalid to field: empty address"
        );
    }

    #[test]
    fn test_zero_recipients_is_mentioned() {
        let error = DeliveryError::from(ValidationError::NoRecipients);
        assert!(error.to_string().contains("zero recipients"));
    }

    #[test]
    fn test_lease_expiry_is_mentioned() {
        let expired_at = Utc::now();
        let error = DeliveryError::LeaseExpired { expired_at };
        assert!(error.to_string().contains("lease expired"));
    }

    #[test]
    fn test_rejected_recipients_display() {
        let error = TransportError::RecipientsRejected {
            rejected: vec!["a@x.com".to_string(), "b@x.com".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "Recipients rejected: a@x.com, b@x.com"
        );
    }

    #[test]
    fn test_spool_error_conversion() {
        let spool_error = SpoolError::Internal("lock poisoned".to_string());
        let error: DeliveryError = spool_error.into();
        assert!(error.to_string().contains("lock poisoned"));
    }
}
