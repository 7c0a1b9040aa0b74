//! Execution contexts for pipeline runs and individual op invocations.

use super::RunIdentity;
use crate::core::{OpOutput, Tags};
use crate::events::{EventSink, NoOpEventSink};
use crate::invocation::ResolvedInvocation;
use crate::utils::iso_timestamp;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Trait unifying pipeline and op context behaviors.
pub trait ExecutionContext: Send + Sync {
    /// Returns the run ID.
    fn run_id(&self) -> Uuid;

    /// Returns the execution mode.
    fn execution_mode(&self) -> &str;

    /// Tries to emit an event; never fails.
    fn try_emit_event(&self, event_type: &str, data: Option<serde_json::Value>);

    /// Checks if the run has been cancelled.
    fn is_cancelled(&self) -> bool;
}

/// The context shared by every invocation of one pipeline run.
pub struct PipelineContext {
    /// Run identity.
    run_identity: RunIdentity,
    /// Name of the pipeline being run.
    pipeline_name: Option<String>,
    /// Execution mode (e.g., "production", "development").
    execution_mode: String,
    /// Event sink for emitting events.
    event_sink: Arc<dyn EventSink>,
    /// Cancellation flag.
    cancelled: AtomicBool,
    /// Cancel reason.
    cancel_reason: RwLock<Option<String>>,
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("run_identity", &self.run_identity)
            .field("pipeline_name", &self.pipeline_name)
            .field("execution_mode", &self.execution_mode)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl PipelineContext {
    /// Creates a new pipeline context that discards events.
    #[must_use]
    pub fn new(run_identity: RunIdentity) -> Self {
        Self {
            run_identity,
            pipeline_name: None,
            execution_mode: "production".to_string(),
            event_sink: Arc::new(NoOpEventSink),
            cancelled: AtomicBool::new(false),
            cancel_reason: RwLock::new(None),
        }
    }

    /// Sets the pipeline name.
    #[must_use]
    pub fn with_pipeline_name(mut self, name: impl Into<String>) -> Self {
        self.pipeline_name = Some(name.into());
        self
    }

    /// Sets the execution mode.
    #[must_use]
    pub fn with_execution_mode(mut self, mode: impl Into<String>) -> Self {
        self.execution_mode = mode.into();
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Marks the context as cancelled with a reason.
    pub fn mark_cancelled_with_reason(&self, reason: impl Into<String>) {
        self.cancelled.store(true, Ordering::SeqCst);
        *self.cancel_reason.write() = Some(reason.into());
    }

    /// Marks the context as cancelled.
    pub fn mark_cancelled(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns the cancel reason, if any.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<String> {
        self.cancel_reason.read().clone()
    }

    /// Returns the run identity.
    #[must_use]
    pub fn run_identity(&self) -> &RunIdentity {
        &self.run_identity
    }

    /// Returns the pipeline name, if set.
    #[must_use]
    pub fn pipeline_name(&self) -> Option<&str> {
        self.pipeline_name.as_deref()
    }

    /// Returns the event sink.
    #[must_use]
    pub fn event_sink(&self) -> &Arc<dyn EventSink> {
        &self.event_sink
    }

    fn enriched(&self, data: Option<serde_json::Value>) -> serde_json::Value {
        let mut enriched = data.unwrap_or_else(|| serde_json::json!({}));

        if let serde_json::Value::Object(ref mut map) = enriched {
            self.run_identity.enrich(map);
            map.insert("execution_mode".to_string(), serde_json::json!(&self.execution_mode));
            map.entry("timestamp")
                .or_insert_with(|| serde_json::json!(iso_timestamp()));
            if let Some(ref name) = self.pipeline_name {
                map.insert("pipeline".to_string(), serde_json::json!(name));
            }
        }

        enriched
    }
}

impl ExecutionContext for PipelineContext {
    fn run_id(&self) -> Uuid {
        self.run_identity.run_id
    }

    fn execution_mode(&self) -> &str {
        &self.execution_mode
    }

    fn try_emit_event(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.event_sink.try_emit(event_type, Some(self.enriched(data)));
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The context handed to an op while it runs for one invocation.
///
/// `tags()` returns the invocation's effective tags exactly as resolved:
/// the definition's declared tags with the invocation overlay applied.
#[derive(Debug, Clone)]
pub struct OpContext {
    /// The pipeline context.
    pipeline_ctx: Arc<PipelineContext>,
    /// The invocation being run.
    invocation: Arc<ResolvedInvocation>,
    /// Outputs of the invocation's upstreams, by identity.
    upstream: HashMap<String, OpOutput>,
}

impl OpContext {
    /// Creates a new op context.
    #[must_use]
    pub fn new(
        pipeline_ctx: Arc<PipelineContext>,
        invocation: Arc<ResolvedInvocation>,
        upstream: HashMap<String, OpOutput>,
    ) -> Self {
        Self {
            pipeline_ctx,
            invocation,
            upstream,
        }
    }

    /// Returns the invocation being run.
    #[must_use]
    pub fn invocation(&self) -> &ResolvedInvocation {
        &self.invocation
    }

    /// Returns the identity (alias) of the invocation being run.
    #[must_use]
    pub fn identity(&self) -> &str {
        self.invocation.identity()
    }

    /// Returns the name of the definition being run.
    #[must_use]
    pub fn definition_name(&self) -> &str {
        self.invocation.definition_name()
    }

    /// Returns the effective tags of the invocation being run.
    #[must_use]
    pub fn tags(&self) -> &Tags {
        self.invocation.effective_tags()
    }

    /// Returns the output of an upstream invocation.
    #[must_use]
    pub fn upstream_output(&self, identity: &str) -> Option<&OpOutput> {
        self.upstream.get(identity)
    }

    /// Returns the pipeline context.
    #[must_use]
    pub fn pipeline_ctx(&self) -> &Arc<PipelineContext> {
        &self.pipeline_ctx
    }
}

impl ExecutionContext for OpContext {
    fn run_id(&self) -> Uuid {
        self.pipeline_ctx.run_id()
    }

    fn execution_mode(&self) -> &str {
        self.pipeline_ctx.execution_mode()
    }

    fn try_emit_event(&self, event_type: &str, data: Option<serde_json::Value>) {
        let mut enriched = data.unwrap_or_else(|| serde_json::json!({}));

        if let serde_json::Value::Object(ref mut map) = enriched {
            map.insert("op".to_string(), serde_json::json!(self.identity()));
            map.insert("definition".to_string(), serde_json::json!(self.definition_name()));
        }

        self.pipeline_ctx.try_emit_event(event_type, Some(enriched));
    }

    fn is_cancelled(&self) -> bool {
        self.pipeline_ctx.is_cancelled()
    }
}
