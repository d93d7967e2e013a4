use anyhow::Result;
use axum::Router;
use clap::Parser;
use docfind_core::persist::{BlobPersistence, Persistence};
use docfind_core::SearchEngine;
use server::{build_app, Engine, ServerConfig};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Data directory holding the persisted documents and index
    #[arg(long, env = "DOCFIND_DATA", default_value = "./docfind-data")]
    data: String,
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

    let persistence: Box<dyn Persistence + Send> = Box::new(BlobPersistence::open_sled(&args.data)?);
    let engine: Engine = SearchEngine::open(persistence)?;
    let app: Router = build_app(engine, ServerConfig::from_env());

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, data = %args.data, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
