//! quarryctl - CLI for the quarry build system
//!
//! Submits build graphs to a coordinator, uploads missing sources,
//! and streams job results back to the terminal.

use clap::Parser;

mod client;
mod commands;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.run().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
