//! Job staging and execution.
//!
//! Each assigned job gets a fresh temporary source directory, a
//! staged copy of the source files it reads, read-locked local copies
//! of its deps' artifacts, and a staging artifact directory that is
//! committed only if every command exits zero.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use quarry_api::{JobResult, JobSpec};
use quarry_cache::{artifact, ArtifactCache, ArtifactHandle, FileCache, FileClient};
use quarry_graph::{Command, JobContext};
use quarry_id::JobId;
use tracing::{debug, info, warn};

/// Stages and runs jobs against the worker's local caches.
pub struct Executor {
    file_cache: FileCache,
    artifacts: ArtifactCache,
    files: FileClient,
    http: reqwest::Client,
}

impl Executor {
    pub fn new(coordinator_url: &str, file_cache: FileCache, artifacts: ArtifactCache) -> Self {
        Self {
            file_cache,
            artifacts,
            files: FileClient::new(coordinator_url),
            http: reqwest::Client::new(),
        }
    }

    /// Runs one job to a result. Staging or spawn failures become a
    /// failed [`JobResult`] rather than an error; the worker always
    /// has something to report. The second value is whether an
    /// artifact was committed.
    pub async fn run_job(&self, spec: &JobSpec) -> (JobResult, bool) {
        match self.execute(spec).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(job = %spec.job.id, error = %e, "job failed before completion");
                (JobResult::failed(spec.job.id, format!("{e:#}")), false)
            }
        }
    }

    async fn execute(&self, spec: &JobSpec) -> Result<(JobResult, bool)> {
        // Fresh per-job sandbox, removed on drop.
        let source_dir = tempfile::tempdir().context("creating source dir")?;
        self.stage_sources(spec, source_dir.path()).await?;

        // Handles keep the dep artifacts pinned for the job's duration.
        let (_handles, dep_dirs) = self.fetch_dep_artifacts(spec).await?;

        let staging = self
            .artifacts
            .create(spec.job.id)
            .context("allocating artifact staging")?;

        let ctx = JobContext {
            source_dir: source_dir.path().to_path_buf(),
            output_dir: staging.path().to_path_buf(),
            deps: dep_dirs,
        };

        let mut result = JobResult {
            id: spec.job.id,
            exit_code: 0,
            stdout: Vec::new(),
            stderr: Vec::new(),
            error: String::new(),
        };

        for cmd in &spec.job.cmds {
            let rendered = cmd.render(&ctx).context("rendering command")?;
            let output = run_command(&rendered, &ctx).await?;

            result.stdout.extend_from_slice(&output.stdout);
            result.stderr.extend_from_slice(&output.stderr);

            if !output.status.success() {
                result.exit_code = output.status.code().unwrap_or(-1);
                result.error = format!(
                    "command '{}' exited with {}",
                    rendered.argv[0], result.exit_code
                );
                debug!(job = %spec.job.id, exit_code = result.exit_code, "command failed");
                staging.abort();
                return Ok((result, false));
            }
        }

        staging.commit().context("committing artifact")?;
        info!(job = %spec.job.id, "artifact committed");
        Ok((result, true))
    }

    /// Downloads and materializes the job's source files under the
    /// sandbox at their declared relative paths.
    async fn stage_sources(&self, spec: &JobSpec, dest: &Path) -> Result<()> {
        for (id, rel_path) in &spec.source_files {
            self.files
                .download(*id, &self.file_cache)
                .await
                .with_context(|| format!("downloading source {id}"))?;

            let handle = self.file_cache.get(*id).await?;
            let target = dest.join(rel_path);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(handle.path(), &target)
                .await
                .with_context(|| format!("materializing {rel_path}"))?;
            debug!(id = %id, path = %rel_path, "source staged");
        }
        Ok(())
    }

    /// Fetches every dep's artifact from its owning worker and returns
    /// pinned handles plus the dep → directory map for rendering.
    async fn fetch_dep_artifacts(
        &self,
        spec: &JobSpec,
    ) -> Result<(Vec<ArtifactHandle>, HashMap<JobId, PathBuf>)> {
        let mut handles = Vec::with_capacity(spec.job.deps.len());
        let mut dirs = HashMap::with_capacity(spec.job.deps.len());

        for dep in &spec.job.deps {
            let owner = spec
                .artifacts
                .get(dep)
                .ok_or_else(|| anyhow!("no artifact locator for dep {dep}"))?;

            artifact::download(&self.http, owner, &self.artifacts, *dep)
                .await
                .with_context(|| format!("fetching artifact {dep} from {owner}"))?;

            let handle = self.artifacts.get(*dep).await?;
            dirs.insert(*dep, handle.path().to_path_buf());
            handles.push(handle);
        }

        Ok((handles, dirs))
    }
}

/// Spawns a rendered command and captures its output. The process
/// inherits the worker's environment with the command's bindings
/// overlaid, and runs in the sandbox unless the command says
/// otherwise.
async fn run_command(rendered: &Command, ctx: &JobContext) -> Result<std::process::Output> {
    let program = rendered
        .argv
        .first()
        .ok_or_else(|| anyhow!("rendered command has an empty argv"))?;

    let mut cmd = tokio::process::Command::new(program);
    cmd.args(&rendered.argv[1..])
        .envs(&rendered.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    match &rendered.working_dir {
        Some(dir) => cmd.current_dir(dir),
        None => cmd.current_dir(&ctx.source_dir),
    };

    cmd.output()
        .await
        .with_context(|| format!("spawning '{program}'"))
}
