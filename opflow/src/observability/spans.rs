//! Spans and span attributes for runs and invocations.

use crate::core::OpStatus;
use crate::invocation::ResolvedInvocation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info_span, Span};
use uuid::Uuid;

/// Creates the span a whole run executes in.
#[must_use]
pub fn pipeline_span(pipeline: &str, run_id: Uuid) -> Span {
    info_span!("pipeline", pipeline = %pipeline, run_id = %run_id)
}

/// Creates the span one invocation executes in.
#[must_use]
pub fn op_span(invocation: &ResolvedInvocation) -> Span {
    info_span!(
        "op",
        op = %invocation.identity(),
        definition = %invocation.definition_name(),
    )
}

/// Exportable attributes describing one finished invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpSpanAttributes {
    /// Invocation identity.
    pub identity: String,
    /// Definition name.
    pub definition: String,
    /// Effective tags.
    pub tags: HashMap<String, String>,
    /// Final status.
    pub status: Option<OpStatus>,
    /// Duration in milliseconds.
    pub duration_ms: Option<f64>,
    /// Error message if failed.
    pub error: Option<String>,
}

impl OpSpanAttributes {
    /// Captures the identity and tags of an invocation.
    #[must_use]
    pub fn for_invocation(invocation: &ResolvedInvocation) -> Self {
        Self {
            identity: invocation.identity().to_string(),
            definition: invocation.definition_name().to_string(),
            tags: invocation.effective_tags().to_hash_map(),
            ..Self::default()
        }
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: OpStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the error.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Flattens into OpenTelemetry-style attributes; tags become `op.tag.<key>`.
    #[must_use]
    pub fn to_otel_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();

        attrs.insert("op.identity".to_string(), self.identity.clone());
        attrs.insert("op.definition".to_string(), self.definition.clone());

        for (key, value) in &self.tags {
            attrs.insert(format!("op.tag.{key}"), value.clone());
        }
        if let Some(status) = self.status {
            attrs.insert("op.status".to_string(), status.to_string());
        }
        if let Some(v) = self.duration_ms {
            attrs.insert("op.duration_ms".to_string(), v.to_string());
        }
        if let Some(ref v) = self.error {
            attrs.insert("op.error".to_string(), v.clone());
        }

        attrs
    }
}

/// Measures elapsed wall time.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
}

impl SpanTimer {
    /// Starts a new timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}
