//! Template expansion for `tmpl:<name>` message content.
//!
//! When a message's content is text starting with [`PREFIX`], the rest of
//! the text names a template. The template is fetched from a
//! [`TemplateSource`] and its `{placeholder}` markers are filled from the
//! message metadata before the driver sees the message.
//!
//! Only the first occurrence of each placeholder is replaced. Templates that
//! repeat a placeholder keep the later copies verbatim.

use super::Middleware;
use crate::context::Context;
use crate::core::{value_to_text, Driver, Message, Metadata, Template, TemplateSource};
use crate::error::DispatchError;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "template";

/// Content prefix that marks a template reference.
pub const PREFIX: &str = "tmpl:";

/// Creates the template rendering middleware.
pub fn new(priority: i32, source: Arc<dyn TemplateSource>) -> Middleware {
    Middleware::new(NAME, priority, move |inner| {
        Arc::new(TemplateDriver {
            inner,
            source: source.clone(),
        }) as Arc<dyn Driver>
    })
}

/// Fills the template's placeholders from `metadata`.
///
/// Arguments are applied in declared order. A missing argument is replaced
/// with the empty string.
pub fn render(template: &Template, metadata: &Metadata) -> String {
    template
        .args
        .iter()
        .fold(template.tmpl.clone(), |content, arg| {
            let placeholder = format!("{{{}}}", arg);
            let value = metadata.get(arg).map(value_to_text).unwrap_or_default();
            content.replacen(&placeholder, &value, 1)
        })
}

struct TemplateDriver {
    inner: Arc<dyn Driver>,
    source: Arc<dyn TemplateSource>,
}

impl TemplateDriver {
    async fn expand(&self, ctx: &Context, name: &str, msg: &Message) -> Result<String, DispatchError> {
        let failed = |reason: String| DispatchError::Template {
            name: name.to_string(),
            reason,
        };

        if name.is_empty() {
            return Err(failed("empty template name".to_string()));
        }

        let template = self
            .source
            .get_template(ctx, name)
            .await
            .map_err(|e| failed(e.to_string()))?
            .ok_or_else(|| failed("not found".to_string()))?;

        if template.tmpl.is_empty() {
            return Err(failed("template is empty".to_string()));
        }

        Ok(render(&template, msg.metadata()))
    }
}

#[async_trait]
impl Driver for TemplateDriver {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn driver_type(&self) -> &str {
        self.inner.driver_type()
    }

    async fn send(&self, ctx: &Context, msg: &Message) -> Result<(), DispatchError> {
        let Some(name) = msg.content().as_text().and_then(|c| c.strip_prefix(PREFIX)) else {
            return self.inner.send(ctx, msg).await;
        };

        let content = self.expand(ctx, name, msg).await?;
        debug!(template = name, "Rendered message template");
        let rendered = msg.clone().with_content(content);
        self.inner.send(ctx, &rendered).await
    }

    fn stop(&self) {
        self.inner.stop()
    }
}

/// An in-memory template source.
#[derive(Debug, Clone, Default)]
pub struct StaticTemplateSource {
    templates: Vec<Template>,
}

impl StaticTemplateSource {
    /// Builds the source from `templates`.
    ///
    /// # Returns
    /// * `Err` if any template has an empty name or body
    ///
    /// The first template wins when names repeat.
    pub fn new(templates: Vec<Template>) -> Result<Self> {
        let mut unique: Vec<Template> = Vec::with_capacity(templates.len());
        for template in templates {
            if template.name.is_empty() {
                anyhow::bail!("the template name must not be empty");
            }
            if template.tmpl.is_empty() {
                anyhow::bail!("the content of template '{}' must not be empty", template.name);
            }
            if !unique.iter().any(|t| t.name == template.name) {
                unique.push(template);
            }
        }
        Ok(Self { templates: unique })
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[async_trait]
impl TemplateSource for StaticTemplateSource {
    async fn get_template(&self, _ctx: &Context, name: &str) -> Result<Option<Template>> {
        Ok(self.templates.iter().find(|t| t.name == name).cloned())
    }
}
