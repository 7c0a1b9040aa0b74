//! Context management for pipeline execution.
//!
//! This module provides:
//! - The run-wide pipeline context (identity, events, cancellation)
//! - The per-invocation op context exposing the invocation's tags

mod execution;
mod identity;

pub use execution::{ExecutionContext, OpContext, PipelineContext};
pub use identity::RunIdentity;
