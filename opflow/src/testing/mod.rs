//! Testing utilities for opflow pipelines.
//!
//! This module provides:
//! - Mock ops that record what they observed
//! - Assertions for tags and run results
//! - Builders for standalone op contexts

mod assertions;
mod mocks;

pub use assertions::{
    assert_invocation_status, assert_output_status, assert_run_failed, assert_run_succeeded,
    assert_tags_eq,
};
pub use mocks::{FailingOp, RecordedExecution, RecordingOp, SlowOp};

use crate::context::{OpContext, PipelineContext, RunIdentity};
use crate::core::Tags;
use crate::definitions::{DefinitionRegistry, OpDefinition};
use crate::invocation::{resolve, InvocationSpec, ResolvedInvocation};
use crate::ops::NoOp;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves a single unaliased invocation of a no-op definition with the
/// given declared tags.
///
/// # Panics
///
/// Panics if `definition` is not a valid name.
#[must_use]
pub fn resolved_for<const N: usize>(definition: &str, tags: [(&str, &str); N]) -> ResolvedInvocation {
    let mut registry = DefinitionRegistry::new();
    registry
        .register(OpDefinition::new(definition, Arc::new(NoOp)).with_tags(Tags::from(tags)))
        .unwrap_or_else(|e| panic!("invalid test definition: {e}"));
    resolve(&registry, &[InvocationSpec::new(definition)])
        .unwrap_or_else(|e| panic!("test invocation did not resolve: {e}"))
        .remove(0)
}

/// Builds an op context for a standalone invocation with no upstreams.
///
/// # Panics
///
/// Panics if `definition` is not a valid name.
#[must_use]
pub fn op_context_for<const N: usize>(definition: &str, tags: [(&str, &str); N]) -> OpContext {
    let pipeline_ctx = Arc::new(PipelineContext::new(RunIdentity::new()));
    OpContext::new(
        pipeline_ctx,
        Arc::new(resolved_for(definition, tags)),
        HashMap::new(),
    )
}
