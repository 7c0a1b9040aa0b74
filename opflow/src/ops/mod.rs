//! Op trait and implementations.
//!
//! An op is the executable body of an [`OpDefinition`](crate::definitions::OpDefinition).
//! The same op runs once per invocation, and each run sees the invocation it
//! belongs to through its [`OpContext`].

use crate::context::OpContext;
use crate::core::OpOutput;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for the executable body of an op definition.
#[async_trait]
pub trait Op: Send + Sync + Debug {
    /// Executes the op for one invocation.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The context of the invocation being run
    async fn execute(&self, ctx: &OpContext) -> OpOutput;
}

/// A simple function-based op.
pub struct FnOp<F>
where
    F: Fn(&OpContext) -> OpOutput + Send + Sync,
{
    func: F,
}

impl<F> FnOp<F>
where
    F: Fn(&OpContext) -> OpOutput + Send + Sync,
{
    /// Creates a new function-based op.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Debug for FnOp<F>
where
    F: Fn(&OpContext) -> OpOutput + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnOp").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Op for FnOp<F>
where
    F: Fn(&OpContext) -> OpOutput + Send + Sync,
{
    async fn execute(&self, ctx: &OpContext) -> OpOutput {
        (self.func)(ctx)
    }
}

/// An op that does nothing and succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOp;

#[async_trait]
impl Op for NoOp {
    async fn execute(&self, _ctx: &OpContext) -> OpOutput {
        OpOutput::ok_empty()
    }
}
