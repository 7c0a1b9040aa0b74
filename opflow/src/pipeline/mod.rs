//! Pipeline building and execution.
//!
//! This module provides:
//! - A builder that resolves invocations and validates the dependency graph
//! - A DAG executor that runs each invocation with its effective tags
//! - Run results

mod builder;
mod dag;
mod result;

#[cfg(test)]
mod integration_tests;

pub use builder::PipelineBuilder;
pub use dag::Pipeline;
pub use result::PipelineRunResult;
