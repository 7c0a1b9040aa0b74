//! Turns invocation specs into resolved invocations.

use super::{InvocationSpec, ResolvedInvocation};
use crate::definitions::{validate_name, DefinitionRegistry};
use crate::errors::{DuplicateIdentityError, ResolutionError};
use std::collections::HashSet;
use tracing::{debug, info};

/// Resolves invocation specs against a definition registry.
#[derive(Debug, Clone, Copy)]
pub struct InvocationResolver<'a> {
    registry: &'a DefinitionRegistry,
}

impl<'a> InvocationResolver<'a> {
    /// Creates a resolver reading from `registry`.
    #[must_use]
    pub fn new(registry: &'a DefinitionRegistry) -> Self {
        Self { registry }
    }

    /// Resolves every spec, in order.
    ///
    /// Each spec's identity is its alias, or the definition name when it has
    /// none. Effective tags start from the definition's declared tags and
    /// take every overlay entry on top, so overlay values win on collision.
    /// The returned list has the same order as `specs`.
    ///
    /// # Errors
    ///
    /// Stops at the first violation and returns nothing else:
    /// - [`ResolutionError::InvalidName`] if an alias is not a valid name,
    /// - [`ResolutionError::DuplicateIdentity`] if an identity repeats,
    /// - [`ResolutionError::UnknownDefinition`] if a definition is missing.
    pub fn resolve(&self, specs: &[InvocationSpec]) -> Result<Vec<ResolvedInvocation>, ResolutionError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(specs.len());
        let mut resolved = Vec::with_capacity(specs.len());

        for spec in specs {
            if let Some(alias) = spec.alias.as_deref() {
                validate_name(alias)?;
            }

            let identity = spec.identity();
            if !seen.insert(identity) {
                return Err(DuplicateIdentityError::new(identity, &spec.definition).into());
            }

            let definition = self.registry.lookup(&spec.definition)?;
            let effective_tags = definition.tags().merged_with(&spec.tags);

            debug!(
                identity = %identity,
                definition = %definition.name(),
                declared = definition.tags().len(),
                overlay = spec.tags.len(),
                effective = effective_tags.len(),
                "Resolved invocation"
            );

            resolved.push(ResolvedInvocation::new(
                identity.to_string(),
                definition,
                effective_tags,
                spec.depends_on.clone(),
            ));
        }

        info!(invocations = resolved.len(), "Resolved pipeline invocations");
        Ok(resolved)
    }
}

/// Resolves `specs` against `registry`.
///
/// Shorthand for `InvocationResolver::new(registry).resolve(specs)`.
///
/// # Errors
///
/// See [`InvocationResolver::resolve`].
pub fn resolve(
    registry: &DefinitionRegistry,
    specs: &[InvocationSpec],
) -> Result<Vec<ResolvedInvocation>, ResolutionError> {
    InvocationResolver::new(registry).resolve(specs)
}
