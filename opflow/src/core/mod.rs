//! Core domain model types for opflow.
//!
//! This module contains the fundamental value types used throughout the framework:
//! - Tag mappings and the overlay merge
//! - Op status enum
//! - Op output type with factory methods

mod output;
mod status;
mod tags;

pub use output::OpOutput;
pub use status::OpStatus;
pub use tags::Tags;
