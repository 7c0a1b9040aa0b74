//! Op definitions: a named op body with its declared tags.

use crate::context::OpContext;
use crate::core::{OpOutput, Tags};
use crate::ops::{FnOp, Op};
use std::sync::Arc;

/// A named, reusable unit of work with static declaration-site tags.
///
/// Definitions are immutable once built and are shared between every
/// invocation that refers to them.
#[derive(Debug, Clone)]
pub struct OpDefinition {
    name: String,
    tags: Tags,
    description: Option<String>,
    op: Arc<dyn Op>,
}

impl OpDefinition {
    /// Creates a new definition with no tags.
    #[must_use]
    pub fn new(name: impl Into<String>, op: Arc<dyn Op>) -> Self {
        Self {
            name: name.into(),
            tags: Tags::new(),
            description: None,
            op,
        }
    }

    /// Creates a definition whose body is a plain function.
    #[must_use]
    pub fn from_fn<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&OpContext) -> OpOutput + Send + Sync + 'static,
    {
        Self::new(name, Arc::new(FnOp::new(func)))
    }

    /// Sets the declared tags.
    #[must_use]
    pub fn with_tags(mut self, tags: impl Into<Tags>) -> Self {
        self.tags = tags.into();
        self
    }

    /// Adds a single declared tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key, value);
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the definition name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared tags.
    #[must_use]
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the op body.
    #[must_use]
    pub fn op(&self) -> &Arc<dyn Op> {
        &self.op
    }
}
