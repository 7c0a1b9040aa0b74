//! Event sink system for observability.
//!
//! The executor reports the lifecycle of a run (`pipeline.*`) and of each
//! invocation (`op.*`) to the [`EventSink`] configured on the
//! [`PipelineContext`](crate::context::PipelineContext).

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event emitted when a run starts.
pub const PIPELINE_STARTED: &str = "pipeline.started";
/// Event emitted when every invocation finished successfully.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// Event emitted when a run ends unsuccessfully.
pub const PIPELINE_FAILED: &str = "pipeline.failed";
/// Event emitted before an op runs.
pub const OP_STARTED: &str = "op.started";
/// Event emitted after an op succeeded.
pub const OP_COMPLETED: &str = "op.completed";
/// Event emitted after an op failed.
pub const OP_FAILED: &str = "op.failed";
/// Event emitted when an invocation is skipped.
pub const OP_SKIPPED: &str = "op.skipped";
/// Event emitted when an invocation is cancelled.
pub const OP_CANCELLED: &str = "op.cancelled";
