//! `quarryctl build`: drive one graph through a coordinator.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use quarry_api::{BuildRequest, SignalRequest, StatusUpdate, UploadDone};
use quarry_cache::FileClient;
use quarry_graph::Graph;

use crate::client::BuildClient;

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Path to the graph JSON file.
    #[arg(long)]
    graph: PathBuf,

    /// Directory missing source files are uploaded from.
    #[arg(long, default_value = ".")]
    source_dir: PathBuf,

    /// Coordinator base URL.
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    coordinator: String,
}

pub async fn run(args: BuildArgs) -> Result<()> {
    let graph: Graph = serde_json::from_slice(
        &std::fs::read(&args.graph)
            .with_context(|| format!("reading {}", args.graph.display()))?,
    )
    .context("parsing graph")?;

    let client = BuildClient::new(&args.coordinator);
    let (started, mut reader) = client
        .start_build(&BuildRequest {
            graph: graph.clone(),
        })
        .await?;

    eprintln!(
        "build {} started ({} source files to upload)",
        started.id,
        started.missing_files.len()
    );

    let files = FileClient::new(&args.coordinator);
    for id in &started.missing_files {
        let rel_path = graph
            .source_files
            .get(id)
            .ok_or_else(|| anyhow!("coordinator requested unknown file {id}"))?;
        files
            .upload(*id, &args.source_dir.join(rel_path))
            .await
            .with_context(|| format!("uploading {rel_path}"))?;
    }

    client
        .signal_build(
            started.id,
            &SignalRequest {
                upload_done: Some(UploadDone {}),
            },
        )
        .await?;

    let mut failed = false;
    while let Some(update) = reader.next().await? {
        match update {
            StatusUpdate::JobFinished(result) => {
                std::io::stdout().write_all(&result.stdout)?;
                std::io::stderr().write_all(&result.stderr)?;
                if result.exit_code != 0 || !result.error.is_empty() {
                    failed = true;
                    eprintln!(
                        "job {} failed (exit {}): {}",
                        result.id, result.exit_code, result.error
                    );
                } else {
                    eprintln!("job {} ok", result.id);
                }
            }
            StatusUpdate::BuildFailed(f) => {
                failed = true;
                eprintln!("build failed: {}", f.error);
            }
            // The reader swallows the finished frame.
            StatusUpdate::BuildFinished(_) => {}
        }
    }

    if failed {
        bail!("build did not complete cleanly");
    }
    eprintln!("build {} finished", started.id);
    Ok(())
}
