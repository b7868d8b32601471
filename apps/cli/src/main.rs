//! Beacon CLI: web evidence ingestion and passage retrieval.
//!
//! Ingestion stores newly seen web pages in a local vector corpus; retrieval
//! returns reranked passages from it for downstream answering.

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
