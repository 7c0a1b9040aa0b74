//! Op definitions and the registry that holds them.

mod definition;
mod naming;
mod registry;

pub use definition::OpDefinition;
pub use naming::{is_valid_name, validate_name, RESERVED_NAMES};
pub use registry::DefinitionRegistry;
