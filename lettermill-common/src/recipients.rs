//! Recipient address fields as they appear on queue documents.

use serde::{Deserialize, Serialize};

/// A recipient field: a single address or an ordered list of addresses.
///
/// Queue documents historically carry either shape. Anything else (numbers,
/// nested arrays, objects) is rejected when the document is decoded, so
/// invalid shapes surface at the boundary instead of deep inside delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, expecting = "a string or an array of strings")]
pub enum AddressField {
    One(String),
    Many(Vec<String>),
}

impl AddressField {
    /// Normalize to an ordered address list.
    ///
    /// A single address becomes a one-element list; a list is used as-is.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(address) => vec![address.clone()],
            Self::Many(addresses) => addresses.clone(),
        }
    }

    /// Whether the field contributes no addresses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::One(_) => false,
            Self::Many(addresses) => addresses.is_empty(),
        }
    }
}

impl From<&str> for AddressField {
    fn from(address: &str) -> Self {
        Self::One(address.to_string())
    }
}

impl From<Vec<String>> for AddressField {
    fn from(addresses: Vec<String>) -> Self {
        Self::Many(addresses)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_single_address_normalizes_to_one_element_list() {
        let field: AddressField = serde_json::from_value(serde_json::json!("a@x.com"))
            .expect("Failed to decode single address");
        assert_eq!(field.to_vec(), vec!["a@x.com".to_string()]);
    }

    #[test]
    fn test_address_list_keeps_order() {
        let field: AddressField = serde_json::from_value(serde_json::json!(["b@x.com", "a@x.com"]))
            .expect("Failed to decode address list");
        assert_eq!(
            field.to_vec(),
            vec!["b@x.com".to_string(), "a@x.com".to_string()]
        );
    }

    #[test]
    fn test_invalid_shapes_are_rejected_at_decode() {
        assert!(serde_json::from_value::<AddressField>(serde_json::json!(42)).is_err());
        assert!(serde_json::from_value::<AddressField>(serde_json::json!([1, 2])).is_err());
        assert!(
            serde_json::from_value::<AddressField>(serde_json::json!({ "email": "a@x.com" }))
                .is_err()
        );
    }

    #[test]
    fn test_emptiness() {
        assert!(AddressField::Many(Vec::new()).is_empty());
        assert!(!AddressField::from("a@x.com").is_empty());
    }
}
