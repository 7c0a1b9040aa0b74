//! Registry of op definitions keyed by name.

use super::naming::validate_name;
use super::OpDefinition;
use crate::errors::{DuplicateDefinitionError, RegistryError, UnknownDefinitionError};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

/// Holds op definitions by name.
///
/// A registry is filled while a pipeline is being authored and only read
/// afterwards; it is handed to the resolver explicitly rather than living in
/// global state.
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    definitions: IndexMap<String, Arc<OpDefinition>>,
}

impl DefinitionRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidName`] if the name is not a valid name
    /// and [`RegistryError::DuplicateDefinition`] if it is already taken.
    pub fn register(&mut self, definition: OpDefinition) -> Result<(), RegistryError> {
        validate_name(definition.name())?;

        if self.definitions.contains_key(definition.name()) {
            return Err(DuplicateDefinitionError::new(definition.name()).into());
        }

        debug!(
            definition = %definition.name(),
            tag_count = definition.tags().len(),
            "Registered op definition"
        );
        self.definitions
            .insert(definition.name().to_string(), Arc::new(definition));
        Ok(())
    }

    /// Looks up a definition by name.
    ///
    /// # Errors
    ///
    /// Returns an error if no definition with that name is registered.
    pub fn lookup(&self, name: &str) -> Result<Arc<OpDefinition>, UnknownDefinitionError> {
        self.definitions
            .get(name)
            .cloned()
            .ok_or_else(|| UnknownDefinitionError::new(name))
    }

    /// Returns true if a definition with the name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Returns registered names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.definitions.keys().map(String::as_str).collect()
    }

    /// Returns the number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
