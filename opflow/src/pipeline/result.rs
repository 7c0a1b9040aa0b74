//! Outcome of one pipeline run.

use crate::core::OpOutput;
use crate::utils::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Result of executing a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRunResult {
    /// Name of the pipeline that ran.
    pub pipeline_name: String,
    /// ID of the run.
    pub run_id: Uuid,
    /// Per-invocation outputs, keyed by identity.
    pub outputs: HashMap<String, OpOutput>,
    /// Whether every invocation ran and none failed.
    pub success: bool,
    /// Error message if the run did not succeed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When execution started.
    pub started_at: Timestamp,
    /// When execution finished.
    pub finished_at: Timestamp,
    /// Total execution time in milliseconds.
    pub duration_ms: f64,
}

impl PipelineRunResult {
    /// Returns the output of one invocation.
    #[must_use]
    pub fn output(&self, identity: &str) -> Option<&OpOutput> {
        self.outputs.get(identity)
    }

    /// Returns the identities of failed invocations, sorted.
    #[must_use]
    pub fn failed_invocations(&self) -> Vec<&str> {
        let mut failed: Vec<&str> = self
            .outputs
            .iter()
            .filter(|(_, output)| output.is_failure())
            .map(|(identity, _)| identity.as_str())
            .collect();
        failed.sort_unstable();
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::now_utc;

    fn result_with(outputs: HashMap<String, OpOutput>) -> PipelineRunResult {
        let now = now_utc();
        PipelineRunResult {
            pipeline_name: "p".to_string(),
            run_id: Uuid::new_v4(),
            outputs,
            success: false,
            error: None,
            started_at: now,
            finished_at: now,
            duration_ms: 0.0,
        }
    }

    #[test]
    fn test_failed_invocations() {
        let mut outputs = HashMap::new();
        outputs.insert("b".to_string(), OpOutput::fail("x"));
        outputs.insert("a".to_string(), OpOutput::fail("y"));
        outputs.insert("c".to_string(), OpOutput::ok_empty());

        let result = result_with(outputs);
        assert_eq!(result.failed_invocations(), vec!["a", "b"]);
        assert!(result.output("c").unwrap().is_success());
        assert!(result.output("d").is_none());
    }

    #[test]
    fn test_serializes_timestamps() {
        let result = result_with(HashMap::new());
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["started_at"].as_str().unwrap().contains('T'));
        assert!(json.get("error").is_none());
    }
}
