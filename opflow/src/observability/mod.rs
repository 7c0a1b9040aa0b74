//! Observability utilities: subscriber setup, spans and span attributes.

mod logging;
mod spans;

pub use logging::init_tracing;
pub use spans::{op_span, pipeline_span, OpSpanAttributes, SpanTimer};
