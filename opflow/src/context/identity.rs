//! Run identity for correlating one pipeline execution.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// The unique ID for this run.
    pub run_id: Uuid,

    /// The request that triggered the run, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
}

impl Default for RunIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl RunIdentity {
    /// Creates a new run identity with a generated run ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_run_id(Uuid::new_v4())
    }

    /// Creates a run identity with a specific run ID.
    #[must_use]
    pub fn with_run_id(run_id: Uuid) -> Self {
        Self {
            run_id,
            request_id: None,
        }
    }

    /// Sets the request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Inserts the identity fields into an event payload.
    pub fn enrich(&self, payload: &mut serde_json::Map<String, serde_json::Value>) {
        payload.insert("run_id".to_string(), serde_json::json!(self.run_id.to_string()));
        if let Some(id) = self.request_id {
            payload.insert("request_id".to_string(), serde_json::json!(id.to_string()));
        }
    }
}
