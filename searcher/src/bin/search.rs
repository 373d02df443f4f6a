use clap::error::ErrorKind;
use clap::Parser;
use linkrank_core::config::{Config, DEFAULT_DATA_DIR, DEFAULT_INDEX_DIR};
use searcher::{format_hits, parse_k, Searcher, DEFAULT_K};
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

/// Return the top k results of the search. k is optional, by default k = 10.
#[derive(Parser)]
#[command(name = "search")]
#[command(override_usage = "search \"query\" [k]")]
struct Args {
    /// Free-text query
    query: String,
    /// Number of results, 1 to 100000
    #[arg(allow_hyphen_values = true)]
    k: Option<String>,
    #[arg(long, env = "LINKRANK_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: String,
    #[arg(long, env = "LINKRANK_INDEX_DIR", default_value = DEFAULT_INDEX_DIR)]
    index_dir: String,
}

fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    let k = match args.k.as_deref().map(parse_k) {
        None => DEFAULT_K,
        Some(Ok(k)) => k,
        Some(Err(e)) => {
            eprintln!("Error! {e}, setting k = {DEFAULT_K}");
            DEFAULT_K
        }
    };

    let searcher = match Searcher::open(Config::new(&args.data_dir, &args.index_dir)) {
        Ok(s) => s,
        Err(e) if e.is_index_unavailable() => {
            eprintln!("Error! Index not constructed ({e}). Run `indexer build` to search");
            return ExitCode::from(1);
        }
        Err(e) => {
            eprintln!("Error! {e}");
            return ExitCode::from(1);
        }
    };

    match searcher.search(&args.query, k) {
        Ok(response) => {
            print!("{}", format_hits(&response.results));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error! {e}");
            ExitCode::from(1)
        }
    }
}
