//! CLI command definitions.

mod build;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// quarryctl - client for the quarry distributed build system.
#[derive(Debug, Parser)]
#[command(name = "quarryctl", version, about)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Submit a build graph and stream its status.
    Build(build::BuildArgs),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Build(args) => build::run(args).await,
        }
    }
}
