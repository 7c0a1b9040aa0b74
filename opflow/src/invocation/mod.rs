//! Invocations of op definitions and their resolution.
//!
//! This module provides:
//! - Invocation specs as authored in a pipeline
//! - The resolver that computes identities and effective tags
//! - Resolved invocations consumed by the executor

mod resolved;
mod resolver;
mod spec;

pub use resolved::ResolvedInvocation;
pub use resolver::{resolve, InvocationResolver};
pub use spec::InvocationSpec;
