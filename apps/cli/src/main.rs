//! TopicBase CLI — topical crawler with a local term and fact store.
//!
//! Crawls a small set of pages around a seed URL, ranks their terms with
//! tf-idf, and records supporting sentences for a curated term list.

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
