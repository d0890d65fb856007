//! Batched uid-to-email resolution.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::{directory::UserDirectory, error::ResolutionError};

/// Resolve a deduplicated uid set through a single directory round trip.
///
/// Returns `uid -> Some(email)` for uids the directory knows an address for
/// and `uid -> None` for the rest. A uid with no directory entry, or an entry
/// without an email, is logged and mapped to `None`, never an error.
///
/// Resolving the same set twice against an unchanged directory yields
/// identical output.
///
/// # Errors
///
/// Returns an error only when the directory itself cannot be queried.
pub async fn resolve_uids(
    directory: &dyn UserDirectory,
    uids: &BTreeSet<String>,
) -> Result<BTreeMap<String, Option<String>>, ResolutionError> {
    if uids.is_empty() {
        return Ok(BTreeMap::new());
    }

    let batch: Vec<String> = uids.iter().cloned().collect();
    let found = directory.lookup_emails(&batch).await?;

    Ok(uids
        .iter()
        .map(|uid| {
            let email = found.get(uid).cloned();
            if email.is_none() {
                warn!(uid = %uid, "No email address on file for uid, skipping recipient");
            }
            (uid.clone(), email)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::directory::MemoryDirectory;

    fn uid_set(uids: &[&str]) -> BTreeSet<String> {
        uids.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_missing_uids_map_to_none() {
        let mut directory = MemoryDirectory::new();
        directory.insert("u1", "u1@x.com");

        let resolved = resolve_uids(&directory, &uid_set(&["u1", "u2"]))
            .await
            .expect("Resolution should succeed");

        assert_eq!(resolved.get("u1"), Some(&Some("u1@x.com".to_string())));
        assert_eq!(resolved.get("u2"), Some(&None));
    }

    #[tokio::test]
    async fn test_one_round_trip_regardless_of_uid_count() {
        let mut directory = MemoryDirectory::new();
        for i in 0..20 {
            directory.insert(format!("u{i}"), format!("u{i}@x.com"));
        }

        let uids: BTreeSet<String> = (0..20).map(|i| format!("u{i}")).collect();
        resolve_uids(&directory, &uids)
            .await
            .expect("Resolution should succeed");

        assert_eq!(directory.lookup_count(), 1);
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let mut directory = MemoryDirectory::new();
        directory.insert("u1", "u1@x.com");
        directory.insert_without_email("u2");

        let uids = uid_set(&["u1", "u2", "u3"]);
        let first = resolve_uids(&directory, &uids)
            .await
            .expect("Resolution should succeed");
        let second = resolve_uids(&directory, &uids)
            .await
            .expect("Resolution should succeed");

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_set_makes_no_lookup() {
        let directory = MemoryDirectory::new();
        let resolved = resolve_uids(&directory, &BTreeSet::new())
            .await
            .expect("Resolution should succeed");

        assert!(resolved.is_empty());
        assert_eq!(directory.lookup_count(), 0);
    }
}
