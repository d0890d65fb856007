//! User directory abstraction for uid-based addressing.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;

use crate::error::ResolutionError;

/// Maps opaque user identifiers to email addresses.
///
/// Lookups are batched: one call covers every uid of an invocation, bounding
/// external round trips to one regardless of recipient count.
#[async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug {
    /// Look up email addresses for `uids`.
    ///
    /// Uids absent from the returned map have no known email address; that is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns an error only when the directory itself cannot be queried.
    async fn lookup_emails(
        &self,
        uids: &[String],
    ) -> Result<HashMap<String, String>, ResolutionError>;
}

/// In-memory directory for development and tests.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    emails: HashMap<String, Option<String>>,
    lookups: AtomicUsize,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a uid with an email address.
    pub fn insert(&mut self, uid: impl Into<String>, email: impl Into<String>) {
        self.emails.insert(uid.into(), Some(email.into()));
    }

    /// Register a uid whose directory entry carries no email address.
    pub fn insert_without_email(&mut self, uid: impl Into<String>) {
        self.emails.insert(uid.into(), None);
    }

    /// Number of batched lookups served so far.
    #[must_use]
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn lookup_emails(
        &self,
        uids: &[String],
    ) -> Result<HashMap<String, String>, ResolutionError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        Ok(uids
            .iter()
            .filter_map(|uid| {
                self.emails
                    .get(uid)
                    .and_then(Clone::clone)
                    .map(|email| (uid.clone(), email))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn test_lookup_skips_unknown_and_email_less_uids() {
        let mut directory = MemoryDirectory::new();
        directory.insert("u1", "u1@x.com");
        directory.insert_without_email("u2");

        let found = directory
            .lookup_emails(&[
                "u1".to_string(),
                "u2".to_string(),
                "unknown".to_string(),
            ])
            .await
            .expect("Lookup should succeed");

        assert_eq!(found.len(), 1);
        assert_eq!(found.get("u1").map(String::as_str), Some("u1@x.com"));
        assert_eq!(directory.lookup_count(), 1);
    }
}
