//! Build graph data model.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use quarry_id::{FileId, JobId};
use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// A complete build request: source files plus the jobs that consume
/// them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    /// Content-addressed source files, keyed by ID, valued by the
    /// path they materialize at relative to the source root.
    #[serde(default)]
    pub source_files: HashMap<FileId, String>,

    /// Jobs to execute.
    #[serde(default)]
    pub jobs: Vec<Job>,
}

impl Graph {
    /// Checks the graph's structural invariants: inputs resolve to
    /// declared source files, deps resolve to jobs, IDs are unique,
    /// and the dependency relation is acyclic.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut ids = HashSet::with_capacity(self.jobs.len());
        for job in &self.jobs {
            if !ids.insert(job.id) {
                return Err(GraphError::DuplicateJob(job.id));
            }
        }

        let paths: HashSet<&str> = self.source_files.values().map(String::as_str).collect();
        for job in &self.jobs {
            for input in &job.inputs {
                if !paths.contains(input.as_str()) {
                    return Err(GraphError::MissingInput {
                        job: job.id,
                        path: input.clone(),
                    });
                }
            }
            for dep in &job.deps {
                if !ids.contains(dep) {
                    return Err(GraphError::UnknownDep {
                        job: job.id,
                        dep: *dep,
                    });
                }
            }
        }

        crate::topsort(&self.jobs).map(|_| ())
    }
}

/// One build job: a set of inputs, upstream deps, and the commands
/// that produce its artifact directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Content-derived job ID; doubles as the artifact ID.
    pub id: JobId,

    /// Human-readable label for logs and status output.
    #[serde(default)]
    pub name: String,

    /// Source file paths this job reads, relative to the source root.
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Jobs whose artifacts this job consumes.
    #[serde(default)]
    pub deps: Vec<JobId>,

    /// Commands to run, in order.
    #[serde(default)]
    pub cmds: Vec<Command>,
}

/// A single templated command.
///
/// Either `argv` is non-empty, or `cat_template`/`cat_output` describe
/// a literal file to write; [`Command::render`] resolves both cases to
/// a concrete argv.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Program and arguments. May contain placeholders.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub argv: Vec<String>,

    /// Environment bindings. Values may contain placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,

    /// Working directory. May contain placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    /// Literal file body to write when `argv` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cat_template: Option<String>,

    /// Destination path for `cat_template`, usually under the output
    /// directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cat_output: Option<String>,
}

/// The directories a job's commands render against.
#[derive(Debug, Clone, Default)]
pub struct JobContext {
    /// Staged source tree for this job.
    pub source_dir: PathBuf,

    /// Artifact staging directory the job writes into.
    pub output_dir: PathBuf,

    /// Materialized artifact directory per upstream dep.
    pub deps: HashMap<JobId, PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: JobId, deps: Vec<JobId>) -> Job {
        Job {
            id,
            name: String::new(),
            inputs: Vec::new(),
            deps,
            cmds: Vec::new(),
        }
    }

    #[test]
    fn test_validate_accepts_chain() {
        let a = JobId::from_content(b"a");
        let b = JobId::from_content(b"b");
        let graph = Graph {
            source_files: HashMap::new(),
            jobs: vec![job(a, vec![]), job(b, vec![a])],
        };
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_input() {
        let a = JobId::from_content(b"a");
        let mut j = job(a, vec![]);
        j.inputs.push("main.c".to_string());
        let graph = Graph {
            source_files: HashMap::new(),
            jobs: vec![j],
        };
        assert!(matches!(
            graph.validate(),
            Err(GraphError::MissingInput { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_dep() {
        let a = JobId::from_content(b"a");
        let ghost = JobId::from_content(b"ghost");
        let graph = Graph {
            source_files: HashMap::new(),
            jobs: vec![job(a, vec![ghost])],
        };
        assert!(matches!(
            graph.validate(),
            Err(GraphError::UnknownDep { .. })
        ));
    }

    #[test]
    fn test_graph_serde_roundtrip() {
        let file = FileId::from_content(b"main.c");
        let a = JobId::from_content(b"compile");
        let mut source_files = HashMap::new();
        source_files.insert(file, "main.c".to_string());
        let mut j = job(a, vec![]);
        j.inputs.push("main.c".to_string());
        j.cmds.push(Command {
            argv: vec!["touch".into(), "{{OUTPUT_DIR}}/out".into()],
            ..Default::default()
        });
        let graph = Graph {
            source_files,
            jobs: vec![j],
        };

        let json = serde_json::to_string(&graph).unwrap();
        let back: Graph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.jobs.len(), 1);
        assert_eq!(back.source_files.get(&file).unwrap(), "main.c");
    }
}
