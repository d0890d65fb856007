//! Template rendering abstraction.
//!
//! Rendering engines are an integration concern: deployments adapt whatever
//! renders their templates behind [`TemplateRenderer`]. The crate ships a
//! table-backed renderer for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use lettermill_common::message::Attachment;

use crate::error::ResolutionError;

/// Output of rendering a named template.
///
/// Absent fields mean the template does not produce them; payload
/// preparation keeps the document's explicit message fields in that case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedTemplate {
    pub subject: Option<String>,
    pub text: Option<String>,
    pub html: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// Maps a template name and data to rendered message content.
#[async_trait]
pub trait TemplateRenderer: Send + Sync + std::fmt::Debug {
    /// Render `name` with `data`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::TemplateNotFound`] for unknown names and
    /// [`ResolutionError::RenderFailed`] when rendering itself fails.
    async fn render(
        &self,
        name: &str,
        data: &serde_json::Value,
    ) -> Result<RenderedTemplate, ResolutionError>;
}

/// Table-backed renderer returning canned outputs per template name.
#[derive(Debug, Default)]
pub struct StaticRenderer {
    templates: HashMap<String, RenderedTemplate>,
}

impl StaticRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the output to return for `name`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, rendered: RenderedTemplate) -> Self {
        self.templates.insert(name.into(), rendered);
        self
    }
}

#[async_trait]
impl TemplateRenderer for StaticRenderer {
    async fn render(
        &self,
        name: &str,
        _data: &serde_json::Value,
    ) -> Result<RenderedTemplate, ResolutionError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| ResolutionError::TemplateNotFound(name.to_string()))
    }
}
