//! Name validation shared by definition names and invocation aliases.

use crate::errors::InvalidNameError;
use regex::Regex;
use std::sync::LazyLock;

static VALID_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+$").unwrap_or_else(|e| panic!("invalid name pattern: {e}"))
});

/// Names that collide with fields or keywords of the execution surface.
pub const RESERVED_NAMES: &[&str] = &[
    "context",
    "conf",
    "config",
    "meta",
    "arg_dict",
    "dict",
    "input_arg_dict",
    "output_arg_dict",
    "int",
    "str",
    "float",
    "bool",
    "input",
    "output",
    "type",
];

/// Returns true if `name` may be used as a definition name or alias.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    VALID_NAME.is_match(name) && !RESERVED_NAMES.contains(&name)
}

/// Validates a definition name or alias.
///
/// # Errors
///
/// Returns an error if the name is empty, contains characters other than
/// ASCII letters, digits and underscores, or is reserved.
pub fn validate_name(name: &str) -> Result<(), InvalidNameError> {
    if name.is_empty() {
        return Err(InvalidNameError::new(name, "name must not be empty"));
    }
    if !VALID_NAME.is_match(name) {
        return Err(InvalidNameError::new(
            name,
            "name must match [A-Za-z0-9_]+",
        ));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(InvalidNameError::new(name, "name is reserved"));
    }
    Ok(())
}
