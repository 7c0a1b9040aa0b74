//! # Opflow
//!
//! Op definitions, aliased invocations and tag resolution for pipelines.
//!
//! An [`OpDefinition`](definitions::OpDefinition) is a reusable unit of work
//! that declares a set of tags. A pipeline invokes definitions, optionally
//! under an alias and with a tag overlay. Each invocation runs with its
//! effective tags: the declared tags with the overlay applied on top, so
//! overlay values win on key collisions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use opflow::prelude::*;
//!
//! # async fn demo() -> Result<(), OpflowError> {
//! let pipeline = PipelineBuilder::new("metadata_pipeline")
//!     .definition(
//!         OpDefinition::from_fn("metadata_solid", |ctx: &OpContext| {
//!             OpOutput::ok_value("foo", serde_json::json!(ctx.tags().get("foo")))
//!         })
//!         .with_tags([("foo", "bar"), ("baz", "quux")]),
//!     )?
//!     .invoke(
//!         InvocationSpec::new("metadata_solid")
//!             .with_alias("aliased_metadata_solid")
//!             .with_tags([("foo", "oof"), ("bip", "bop")]),
//!     )
//!     .build()?;
//!
//! let result = pipeline.run().await?;
//! assert!(result.success);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod definitions;
pub mod errors;
pub mod events;
pub mod invocation;
pub mod observability;
pub mod ops;
pub mod pipeline;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ExecutionConfig, LoggingConfig, OpflowConfig};
    pub use crate::context::{ExecutionContext, OpContext, PipelineContext, RunIdentity};
    pub use crate::core::{OpOutput, OpStatus, Tags};
    pub use crate::definitions::{DefinitionRegistry, OpDefinition};
    pub use crate::errors::{
        ContractErrorInfo, CycleDetectedError, OpflowError, PipelineValidationError,
        RegistryError, ResolutionError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::invocation::{resolve, InvocationSpec, ResolvedInvocation};
    pub use crate::observability::init_tracing;
    pub use crate::ops::{FnOp, NoOp, Op};
    pub use crate::pipeline::{Pipeline, PipelineBuilder, PipelineRunResult};
    pub use crate::utils::{iso_timestamp, Timestamp};
}
