use anyhow::Result;
use axum::Router;
use clap::Parser;
use search_core::DocCount;
use server::{build_app, ServerConfig};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Document count used for idf: "docs" (distinct documents) or "terms" (legacy)
    #[arg(long, default_value = "docs")]
    doc_count: DocCount,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let app: Router = build_app(ServerConfig::from_env(&args.index, args.doc_count))?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, index = %args.index, doc_count = %args.doc_count, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
