//! Error types for the opflow framework.
//!
//! Every failure raised while registering definitions, resolving invocations
//! or validating a pipeline is a dedicated error struct carrying a
//! [`ContractErrorInfo`] with a stable code, so callers can match on the code
//! rather than on message text.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for opflow operations.
#[derive(Debug, Error)]
pub enum OpflowError {
    /// A pipeline validation error occurred.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A definition was registered twice.
    #[error("{0}")]
    DuplicateDefinition(#[from] DuplicateDefinitionError),

    /// An invocation named a definition that was never registered.
    #[error("{0}")]
    UnknownDefinition(#[from] UnknownDefinitionError),

    /// Two invocations resolved to the same identity.
    #[error("{0}")]
    DuplicateIdentity(#[from] DuplicateIdentityError),

    /// A definition name or alias is not a valid name.
    #[error("{0}")]
    InvalidName(#[from] InvalidNameError),

    /// A cycle was detected in the pipeline.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RegistryError> for OpflowError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateDefinition(e) => Self::DuplicateDefinition(e),
            RegistryError::InvalidName(e) => Self::InvalidName(e),
        }
    }
}

impl From<ResolutionError> for OpflowError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::UnknownDefinition(e) => Self::UnknownDefinition(e),
            ResolutionError::DuplicateIdentity(e) => Self::DuplicateIdentity(e),
            ResolutionError::InvalidName(e) => Self::InvalidName(e),
        }
    }
}

impl OpflowError {
    /// Returns the contract diagnostics attached to this error, if any.
    #[must_use]
    pub fn error_info(&self) -> Option<ContractErrorInfo> {
        match self {
            Self::Validation(e) => e.error_info.clone(),
            Self::DuplicateDefinition(e) => Some(e.error_info()),
            Self::UnknownDefinition(e) => Some(e.error_info()),
            Self::DuplicateIdentity(e) => Some(e.error_info()),
            Self::InvalidName(e) => Some(e.error_info()),
            Self::CycleDetected(e) => Some(e.error_info.clone()),
            Self::Config(_) | Self::Internal(_) => None,
        }
    }
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "CONTRACT-004-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Sets the fix hint to the stock suggestion for this error's code, if
    /// there is one.
    #[must_use]
    pub fn with_suggested_fix(mut self) -> Self {
        if let Some(hint) = ContractSuggestions::get(&self.code) {
            self.fix_hint = Some(hint.to_string());
        }
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::Value::String(self.code.clone()));
        map.insert("summary".to_string(), serde_json::Value::String(self.summary.clone()));

        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::Value::String(hint.clone()));
        }
        if !self.context.is_empty() {
            let context_map: serde_json::Map<String, serde_json::Value> = self
                .context
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            map.insert("context".to_string(), serde_json::Value::Object(context_map));
        }

        map
    }
}

/// Error raised when pipeline validation fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The invocations involved in the error.
    pub invocations: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            invocations: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the invocations involved.
    #[must_use]
    pub fn with_invocations(mut self, invocations: Vec<String>) -> Self {
        self.invocations = invocations;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::Value::String(self.message.clone()));
        map.insert(
            "invocations".to_string(),
            serde_json::Value::Array(
                self.invocations
                    .iter()
                    .map(|s| serde_json::Value::String(s.clone()))
                    .collect(),
            ),
        );
        if let Some(ref info) = self.error_info {
            let info_map: serde_json::Map<String, serde_json::Value> =
                info.to_dict().into_iter().collect();
            map.insert("error_info".to_string(), serde_json::Value::Object(info_map));
        }
        map
    }
}

/// Error raised when a cycle is detected between invocations.
#[derive(Debug, Clone, Error)]
#[error("Cycle detected in pipeline: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of invocation identities forming the cycle.
    pub cycle_path: Vec<String>,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        let info = ContractErrorInfo::new(
            "CONTRACT-004-CYCLE",
            format!("Pipeline contains a dependency cycle: {}", cycle_path.join(" -> ")),
        )
        .with_suggested_fix();

        Self {
            cycle_path,
            error_info: info,
        }
    }
}

/// Error raised when a definition name is registered twice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Duplicate definition: an op named '{name}' is already registered")]
pub struct DuplicateDefinitionError {
    /// The conflicting definition name.
    pub name: String,
}

impl DuplicateDefinitionError {
    /// Creates a new duplicate definition error.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the contract diagnostics for this error.
    #[must_use]
    pub fn error_info(&self) -> ContractErrorInfo {
        ContractErrorInfo::new(
            "CONTRACT-101-DUPLICATE_DEFINITION",
            format!("Definition '{}' registered more than once", self.name),
        )
        .with_fix_hint("Give each op definition a unique name.")
        .with_context_entry("definition", &self.name)
    }
}

/// Error raised when an invocation references an unregistered definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown definition: no op named '{name}' is registered")]
pub struct UnknownDefinitionError {
    /// The definition name that could not be found.
    pub name: String,
}

impl UnknownDefinitionError {
    /// Creates a new unknown definition error.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the contract diagnostics for this error.
    #[must_use]
    pub fn error_info(&self) -> ContractErrorInfo {
        ContractErrorInfo::new(
            "CONTRACT-102-UNKNOWN_DEFINITION",
            format!("Definition '{}' not found", self.name),
        )
        .with_fix_hint("Register the op definition before invoking it.")
        .with_context_entry("definition", &self.name)
    }
}

/// Error raised when two invocations resolve to the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Duplicate identity: invocation '{identity}' is declared more than once (definition '{definition}')")]
pub struct DuplicateIdentityError {
    /// The identity shared by both invocations.
    pub identity: String,
    /// The definition named by the rejected invocation.
    pub definition: String,
}

impl DuplicateIdentityError {
    /// Creates a new duplicate identity error.
    #[must_use]
    pub fn new(identity: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            definition: definition.into(),
        }
    }

    /// Returns the contract diagnostics for this error.
    #[must_use]
    pub fn error_info(&self) -> ContractErrorInfo {
        ContractErrorInfo::new(
            "CONTRACT-103-DUPLICATE_IDENTITY",
            format!("Invocation identity '{}' is not unique", self.identity),
        )
        .with_fix_hint("Give each invocation of the same op a distinct alias.")
        .with_context_entry("identity", &self.identity)
        .with_context_entry("definition", &self.definition)
    }
}

/// Error raised when a definition name or alias is not a valid name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid name '{name}': {reason}")]
pub struct InvalidNameError {
    /// The rejected name.
    pub name: String,
    /// Why it was rejected.
    pub reason: String,
}

impl InvalidNameError {
    /// Creates a new invalid name error.
    #[must_use]
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns the contract diagnostics for this error.
    #[must_use]
    pub fn error_info(&self) -> ContractErrorInfo {
        ContractErrorInfo::new(
            "CONTRACT-104-INVALID_NAME",
            format!("'{}' is not a valid name", self.name),
        )
        .with_fix_hint("Use only letters, digits and underscores, and avoid reserved words.")
        .with_context_entry("reason", &self.reason)
    }
}

/// Errors returned by [`crate::definitions::DefinitionRegistry::register`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The name is already taken.
    #[error("{0}")]
    DuplicateDefinition(#[from] DuplicateDefinitionError),

    /// The name is not a valid name.
    #[error("{0}")]
    InvalidName(#[from] InvalidNameError),
}

/// Errors returned while resolving invocation specs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// A spec named a definition that is not registered.
    #[error("{0}")]
    UnknownDefinition(#[from] UnknownDefinitionError),

    /// Two specs resolved to the same identity.
    #[error("{0}")]
    DuplicateIdentity(#[from] DuplicateIdentityError),

    /// An alias is not a valid name.
    #[error("{0}")]
    InvalidName(#[from] InvalidNameError),
}

impl ResolutionError {
    /// Returns the contract diagnostics for this error.
    #[must_use]
    pub fn error_info(&self) -> ContractErrorInfo {
        match self {
            Self::UnknownDefinition(e) => e.error_info(),
            Self::DuplicateIdentity(e) => e.error_info(),
            Self::InvalidName(e) => e.error_info(),
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        /// The path that was read.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is not valid JSON for the expected shape.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("Invalid config value for '{field}': {reason}")]
    Invalid {
        /// The offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Provides default suggestions for common contract error codes.
pub struct ContractSuggestions;

impl ContractSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            "CONTRACT-004-CYCLE" => Some(
                "Check your invocation dependencies for circular references. \
                 Use a linear chain or fan-out pattern instead.",
            ),
            "CONTRACT-004-MISSING_DEP" => Some(
                "Ensure all dependencies reference invocation identities (aliases) \
                 that exist in the pipeline.",
            ),
            "CONTRACT-004-EMPTY" => Some("Invoke at least one op before building the pipeline."),
            "CONTRACT-101-DUPLICATE_DEFINITION" => Some(
                "Each op definition must have a unique name within a pipeline.",
            ),
            "CONTRACT-102-UNKNOWN_DEFINITION" => Some(
                "Register the op definition with the pipeline before invoking it. \
                 Check for typos in the definition name.",
            ),
            "CONTRACT-103-DUPLICATE_IDENTITY" => Some(
                "An op invoked more than once needs a distinct alias per invocation.",
            ),
            "CONTRACT-104-INVALID_NAME" => Some(
                "Names must match [A-Za-z0-9_]+ and must not be a reserved word.",
            ),
            _ => None,
        }
    }
}
