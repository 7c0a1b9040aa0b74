//! Mock ops for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

use crate::context::OpContext;
use crate::core::{OpOutput, Tags};
use crate::ops::Op;

/// What an op saw during one execution.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedExecution {
    /// Identity of the invocation that ran.
    pub identity: String,
    /// Definition name of the invocation that ran.
    pub definition: String,
    /// Tags exposed through the context.
    pub tags: Tags,
    /// Identities of the upstream outputs that were visible.
    pub upstream: Vec<String>,
}

/// An op that records every execution and returns a configurable output.
#[derive(Debug)]
pub struct RecordingOp {
    output: Mutex<OpOutput>,
    executions: Mutex<Vec<RecordedExecution>>,
}

impl Default for RecordingOp {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingOp {
    /// Creates a recording op that succeeds with no data.
    #[must_use]
    pub fn new() -> Self {
        Self {
            output: Mutex::new(OpOutput::ok_empty()),
            executions: Mutex::new(Vec::new()),
        }
    }

    /// Sets the output returned by later executions.
    pub fn set_output(&self, output: OpOutput) {
        *self.output.lock() = output;
    }

    /// Returns all recorded executions.
    #[must_use]
    pub fn executions(&self) -> Vec<RecordedExecution> {
        self.executions.lock().clone()
    }

    /// Returns the number of executions.
    #[must_use]
    pub fn execution_count(&self) -> usize {
        self.executions.lock().len()
    }

    /// Returns the recorded execution of one invocation.
    #[must_use]
    pub fn execution_for(&self, identity: &str) -> Option<RecordedExecution> {
        self.executions
            .lock()
            .iter()
            .find(|e| e.identity == identity)
            .cloned()
    }
}

#[async_trait]
impl Op for RecordingOp {
    async fn execute(&self, ctx: &OpContext) -> OpOutput {
        let mut upstream: Vec<String> = ctx
            .invocation()
            .depends_on()
            .iter()
            .filter(|id| ctx.upstream_output(id).is_some())
            .cloned()
            .collect();
        upstream.sort();
        upstream.dedup();

        self.executions.lock().push(RecordedExecution {
            identity: ctx.identity().to_string(),
            definition: ctx.definition_name().to_string(),
            tags: ctx.tags().clone(),
            upstream,
        });
        self.output.lock().clone()
    }
}

/// An op that always fails.
#[derive(Debug)]
pub struct FailingOp {
    error: String,
}

impl FailingOp {
    /// Creates a failing op with an error message.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[async_trait]
impl Op for FailingOp {
    async fn execute(&self, _ctx: &OpContext) -> OpOutput {
        OpOutput::fail(&self.error)
    }
}

/// An op that sleeps before succeeding.
#[derive(Debug)]
pub struct SlowOp {
    delay: Duration,
}

impl SlowOp {
    /// Creates a slow op with a delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(ms),
        }
    }
}

#[async_trait]
impl Op for SlowOp {
    async fn execute(&self, _ctx: &OpContext) -> OpOutput {
        tokio::time::sleep(self.delay).await;
        OpOutput::ok_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::op_context_for;

    #[tokio::test]
    async fn test_recording_op() {
        let op = RecordingOp::new();
        let ctx = op_context_for("metadata_solid", [("foo", "bar")]);

        let output = op.execute(&ctx).await;

        assert!(output.is_success());
        assert_eq!(op.execution_count(), 1);
        let recorded = op.execution_for("metadata_solid").unwrap();
        assert_eq!(recorded.tags, Tags::from([("foo", "bar")]));
        assert_eq!(recorded.definition, "metadata_solid");
        assert!(recorded.upstream.is_empty());
    }

    #[tokio::test]
    async fn test_recording_op_custom_output() {
        let op = RecordingOp::new();
        op.set_output(OpOutput::ok_value("n", serde_json::json!(1)));

        let output = op.execute(&op_context_for("op", [])).await;
        assert_eq!(output.get("n"), Some(&serde_json::json!(1)));
    }

    #[tokio::test]
    async fn test_failing_op() {
        let op = FailingOp::new("boom");
        let output = op.execute(&op_context_for("op", [])).await;
        assert!(output.is_failure());
        assert_eq!(output.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_slow_op() {
        let op = SlowOp::with_delay_ms(5);
        let output = op.execute(&op_context_for("op", [])).await;
        assert!(output.is_success());
    }
}
