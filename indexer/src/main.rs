use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use linkrank_core::builder::build;
use linkrank_core::config::{Config, DEFAULT_DATA_DIR, DEFAULT_INDEX_DIR};
use linkrank_core::corpus::load_documents;
use linkrank_core::persist::{load_meta, publish, read_current, IndexPaths};
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and inspect the link-weighted inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index from the corpus field files and publish it
    Build {
        /// Directory holding title.txt, author.txt, category.txt, post_text.txt, ...
        #[arg(long, env = "LINKRANK_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
        data_dir: String,
        /// Index root directory
        #[arg(long, env = "LINKRANK_INDEX_DIR", default_value = DEFAULT_INDEX_DIR)]
        index_dir: String,
    },
    /// Print metadata of the published index
    Stats {
        #[arg(long, env = "LINKRANK_INDEX_DIR", default_value = DEFAULT_INDEX_DIR)]
        index_dir: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { data_dir, index_dir } => build_index(&Config::new(data_dir, index_dir)),
        Commands::Stats { index_dir } => print_stats(&IndexPaths::new(index_dir)),
    }
}

fn build_index(config: &Config) -> Result<()> {
    let start = Instant::now();
    tracing::info!(data = %config.corpus.root.display(), "parsing corpus");
    let documents = load_documents(&config.corpus).context("failed to read corpus")?;

    let index = build(&documents);

    let published = publish(&config.index, &index).context("failed to write index")?;
    tracing::info!(
        generation = %published.generation,
        num_docs = published.meta.num_docs,
        num_terms = published.meta.num_terms,
        "index build complete"
    );
    println!(
        "Index constructed in {:.2} seconds. Ready to search.\nSearch using: search \"query\" [k]",
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn print_stats(paths: &IndexPaths) -> Result<()> {
    let generation = read_current(paths).context("no published index; run `indexer build` first")?;
    let meta = load_meta(&paths.generation(&generation))?;
    println!("generation: {generation}");
    println!("{}", serde_json::to_string_pretty(&meta)?);
    Ok(())
}
