use anyhow::Result;
use axum::Router;
use clap::Parser;
use linkrank_core::config::{Config, DEFAULT_DATA_DIR, DEFAULT_INDEX_DIR};
use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};
use searcher::build_app;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "search-server")]
struct Args {
    /// Corpus directory (titles, URLs and inbound link counts)
    #[arg(long, env = "LINKRANK_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: String,
    /// Index root directory
    #[arg(long, env = "LINKRANK_INDEX_DIR", default_value = DEFAULT_INDEX_DIR)]
    index_dir: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let app: Router = build_app(Config::new(&args.data_dir, &args.index_dir))?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
