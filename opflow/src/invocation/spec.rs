//! Invocation specifications: one entry of a pipeline's invocation list.

use crate::core::Tags;
use serde::{Deserialize, Serialize};

/// One use of an op definition inside a pipeline.
///
/// The same definition may be invoked several times as long as each
/// invocation resolves to a distinct identity (its alias, or the definition
/// name when no alias is given).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationSpec {
    /// Name of the invoked definition.
    pub definition: String,
    /// Alias the invocation is known by within the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Invocation-site tags overriding the definition's declared tags.
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
    /// Identities of invocations that must finish before this one runs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl InvocationSpec {
    /// Creates an unaliased invocation of a definition.
    #[must_use]
    pub fn new(definition: impl Into<String>) -> Self {
        Self {
            definition: definition.into(),
            alias: None,
            tags: Tags::new(),
            depends_on: Vec::new(),
        }
    }

    /// Sets the alias.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets the tag overlay.
    #[must_use]
    pub fn with_tags(mut self, tags: impl Into<Tags>) -> Self {
        self.tags = tags.into();
        self
    }

    /// Adds a single overlay tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key, value);
        self
    }

    /// Adds an upstream dependency by identity.
    #[must_use]
    pub fn depends_on(mut self, identity: impl Into<String>) -> Self {
        self.depends_on.push(identity.into());
        self
    }

    /// Returns the identity this spec resolves to.
    #[must_use]
    pub fn identity(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.definition)
    }
}
