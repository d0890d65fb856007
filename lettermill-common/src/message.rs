//! Message content carried by queue documents.

use serde::{Deserialize, Serialize};

/// An email attachment with filename, content type, and data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// The filename to use in the MIME header.
    pub filename: String,
    /// The MIME content type (e.g., "application/pdf").
    pub content_type: String,
    /// The attachment data.
    pub data: Vec<u8>,
}

/// The by-value message fields of a queue document.
///
/// Every field is optional on the wire: a document may carry its content
/// explicitly, rely entirely on a template, or mix both. Template output is
/// merged into these fields during payload preparation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageContent {
    pub subject: Option<String>,
    pub text: Option<String>,
    pub html: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl MessageContent {
    /// Whether no content has been supplied at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.text.is_none()
            && self.html.is_none()
            && self.attachments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_message_content_defaults_to_empty() {
        let message = MessageContent::default();
        assert!(message.is_empty());
        assert_eq!(message.attachments.len(), 0);
    }

    #[test]
    fn test_message_content_wire_field_names() {
        let raw = serde_json::json!({
            "subject": "hi",
            "text": "hello",
            "attachments": [
                { "filename": "a.txt", "contentType": "text/plain", "data": [104, 105] }
            ]
        });

        let message: MessageContent = serde_json::from_value(raw).expect("Failed to decode");
        assert_eq!(message.subject.as_deref(), Some("hi"));
        assert_eq!(message.attachments[0].content_type, "text/plain");
        assert!(!message.is_empty());
    }
}
