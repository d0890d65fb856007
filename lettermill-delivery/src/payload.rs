//! Payload preparation: template merge, recipient resolution, validation.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use lettermill_common::{
    config::Config,
    document::QueueDocument,
    message::MessageContent,
    recipients::AddressField,
};

use crate::{
    directory::UserDirectory,
    error::{DeliveryError, ValidationError},
    resolver::resolve_uids,
    template::TemplateRenderer,
};

/// A fully normalized, ready-to-send delivery payload.
///
/// Recipient lists contain plain addresses only (uid resolution has already
/// happened) and the message carries the merged template output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryPayload {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub from: Option<String>,
    pub reply_to: Option<String>,
    pub headers: HashMap<String, String>,
    pub message: MessageContent,
}

impl DeliveryPayload {
    /// Every recipient across to/cc/bcc, in field order.
    #[must_use]
    pub fn all_recipients(&self) -> Vec<String> {
        self.to
            .iter()
            .chain(self.cc.iter())
            .chain(self.bcc.iter())
            .cloned()
            .collect()
    }

    /// Total recipient count across to/cc/bcc.
    #[must_use]
    pub fn recipient_count(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }
}

/// Normalizes a raw queue document into a validated delivery payload.
///
/// Preparation fails with a [`ValidationError`] when a template carries no
/// name, when uid addressing is requested without a configured directory,
/// when a recipient field contains an invalid entry, or when every recipient
/// list comes out empty after resolution.
#[derive(Debug, Clone)]
pub struct PayloadPreparer {
    renderer: Option<Arc<dyn TemplateRenderer>>,
    directory: Option<Arc<dyn UserDirectory>>,
    default_from: Option<String>,
    default_reply_to: Option<String>,
}

impl PayloadPreparer {
    /// Build a preparer with the process-wide defaults from `config` and no
    /// renderer or directory attached.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            renderer: None,
            directory: None,
            default_from: config.default_from.clone(),
            default_reply_to: config.default_reply_to.clone(),
        }
    }

    /// Attach a template renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Attach a user directory for uid-based addressing.
    #[must_use]
    pub fn with_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Prepare one document for delivery.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad document shapes and a resolution
    /// error when the renderer or directory fails.
    pub async fn prepare(&self, document: &QueueDocument) -> Result<DeliveryPayload, DeliveryError> {
        let message = self.merged_message(document).await?;
        let (to, cc, bcc) = self.resolved_recipients(document).await?;

        if to.is_empty() && cc.is_empty() && bcc.is_empty() {
            return Err(ValidationError::NoRecipients.into());
        }

        Ok(DeliveryPayload {
            to,
            cc,
            bcc,
            from: document.from.clone().or_else(|| self.default_from.clone()),
            reply_to: document
                .reply_to
                .clone()
                .or_else(|| self.default_reply_to.clone()),
            headers: document.headers.clone(),
            message,
        })
    }

    /// Merge rendered template output into the document's explicit message.
    ///
    /// Fields the template produces win over explicit fields; fields it does
    /// not produce keep the explicit values. Template attachments replace
    /// explicit attachments only when the template actually produced some.
    async fn merged_message(
        &self,
        document: &QueueDocument,
    ) -> Result<MessageContent, DeliveryError> {
        let mut message = document.message.clone().unwrap_or_default();

        let Some(template) = &document.template else {
            return Ok(message);
        };

        let name = template
            .name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or(ValidationError::TemplateMissingName)?;

        let Some(renderer) = &self.renderer else {
            return Err(ValidationError::TemplatesNotConfigured.into());
        };

        let data = template.data.clone().unwrap_or(serde_json::Value::Null);
        let rendered = renderer.render(name, &data).await?;

        if rendered.subject.is_some() {
            message.subject = rendered.subject;
        }
        if rendered.text.is_some() {
            message.text = rendered.text;
        }
        if rendered.html.is_some() {
            message.html = rendered.html;
        }
        if !rendered.attachments.is_empty() {
            message.attachments = rendered.attachments;
        }

        Ok(message)
    }

    /// Normalize literal recipient fields and append uid-resolved addresses.
    ///
    /// Literal addresses are seeded first; uid-derived addresses follow in
    /// the original uid-field order. The uid union is resolved through one
    /// directory round trip.
    async fn resolved_recipients(
        &self,
        document: &QueueDocument,
    ) -> Result<(Vec<String>, Vec<String>, Vec<String>), DeliveryError> {
        let mut to = normalized("to", document.to.as_ref())?;
        let mut cc = normalized("cc", document.cc.as_ref())?;
        let mut bcc = normalized("bcc", document.bcc.as_ref())?;

        if !document.uses_uids() {
            return Ok((to, cc, bcc));
        }

        let Some(directory) = &self.directory else {
            return Err(ValidationError::UidsWithoutDirectory.into());
        };

        let uid_fields = [
            ("toUids", &document.to_uids),
            ("ccUids", &document.cc_uids),
            ("bccUids", &document.bcc_uids),
        ];

        let mut uids = BTreeSet::new();
        for (field, value) in uid_fields {
            let Some(value) = value else { continue };
            for uid in value {
                if uid.trim().is_empty() {
                    return Err(ValidationError::InvalidRecipients {
                        field,
                        reason: "empty uid".to_string(),
                    }
                    .into());
                }
                uids.insert(uid.clone());
            }
        }

        let resolved = resolve_uids(directory.as_ref(), &uids).await?;

        append_resolved(&mut to, document.to_uids.as_deref(), &resolved);
        append_resolved(&mut cc, document.cc_uids.as_deref(), &resolved);
        append_resolved(&mut bcc, document.bcc_uids.as_deref(), &resolved);

        Ok((to, cc, bcc))
    }
}

/// Normalize one literal address field.
fn normalized(
    field: &'static str,
    value: Option<&AddressField>,
) -> Result<Vec<String>, ValidationError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };

    let addresses = value.to_vec();
    for address in &addresses {
        if address.trim().is_empty() {
            return Err(ValidationError::InvalidRecipients {
                field,
                reason: "empty address".to_string(),
            });
        }
    }

    Ok(addresses)
}

/// Append resolved uid addresses after the literal ones, keeping uid order.
fn append_resolved(
    addresses: &mut Vec<String>,
    uids: Option<&[String]>,
    resolved: &BTreeMap<String, Option<String>>,
) {
    let Some(uids) = uids else { return };
    for uid in uids {
        if let Some(Some(email)) = resolved.get(uid) {
            addresses.push(email.clone());
        }
    }
}
