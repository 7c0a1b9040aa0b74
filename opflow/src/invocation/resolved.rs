//! Resolved invocations: the units handed to the executor.

use crate::core::Tags;
use crate::definitions::OpDefinition;
use std::sync::Arc;

/// An invocation whose identity and effective tags have been computed.
///
/// The definition is shared with the registry; the effective tags are a
/// fresh mapping owned by this invocation alone.
#[derive(Debug, Clone)]
pub struct ResolvedInvocation {
    identity: String,
    definition: Arc<OpDefinition>,
    effective_tags: Tags,
    depends_on: Vec<String>,
}

impl ResolvedInvocation {
    pub(crate) fn new(
        identity: String,
        definition: Arc<OpDefinition>,
        effective_tags: Tags,
        depends_on: Vec<String>,
    ) -> Self {
        Self {
            identity,
            definition,
            effective_tags,
            depends_on,
        }
    }

    /// Returns the identity (alias) of the invocation.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns the invoked definition.
    #[must_use]
    pub fn definition(&self) -> &Arc<OpDefinition> {
        &self.definition
    }

    /// Returns the name of the invoked definition.
    #[must_use]
    pub fn definition_name(&self) -> &str {
        self.definition.name()
    }

    /// Returns true if the invocation is known under a name other than its
    /// definition's.
    #[must_use]
    pub fn is_aliased(&self) -> bool {
        self.identity != self.definition.name()
    }

    /// Returns the merged tags.
    #[must_use]
    pub fn effective_tags(&self) -> &Tags {
        &self.effective_tags
    }

    /// Returns the identities this invocation depends on.
    #[must_use]
    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }
}
