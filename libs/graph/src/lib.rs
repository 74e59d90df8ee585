//! # quarry-graph
//!
//! The build graph model: jobs, commands, and the orderings between
//! them.
//!
//! A [`Graph`] maps content-addressed source files to their paths and
//! carries the set of [`Job`]s to run. [`topsort`] produces a
//! dependency-respecting execution order, and [`Command::render`]
//! turns a templated command into a concrete argv against a job's
//! staging directories.

mod error;
mod render;
mod topsort;
mod types;

pub use error::{GraphError, RenderError};
pub use topsort::topsort;
pub use types::{Command, Graph, Job, JobContext};
