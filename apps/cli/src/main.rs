//! tagtree CLI: import tag taxonomies into a content-addressed tree.
//!
//! Fetches one tag source, normalizes every record into a canonical TOML
//! document and writes the documents into a deterministic directory tree.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
