//! Error types for graph validation and command rendering.

use quarry_id::JobId;
use thiserror::Error;

/// Errors from validating or ordering a build graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A job input path has no entry in the graph's source files.
    #[error("job {job} reads '{path}' which is not a declared source file")]
    MissingInput { job: JobId, path: String },

    /// A job depends on an ID that is not a job in the graph.
    #[error("job {job} depends on unknown job {dep}")]
    UnknownDep { job: JobId, dep: JobId },

    /// Two jobs share one ID.
    #[error("duplicate job ID {0}")]
    DuplicateJob(JobId),

    /// The dependency relation contains a cycle.
    #[error("dependency cycle through job {0}")]
    Cycle(JobId),
}

/// Errors from rendering a command against its job context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A `{{DEP:...}}` placeholder references a dep the job does not have.
    #[error("placeholder references unknown dep {0}")]
    UnknownDep(JobId),

    /// A placeholder name is not part of the rendering contract.
    #[error("unknown placeholder '{0}'")]
    UnknownPlaceholder(String),

    /// A placeholder was opened but never closed.
    #[error("unterminated placeholder in '{0}'")]
    Unterminated(String),

    /// The command has neither an argv nor a cat template.
    #[error("command has nothing to run")]
    EmptyCommand,
}
