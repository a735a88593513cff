use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hackscout_common::AppConfig;
use hackscout_pipeline::Pipeline;
use hackscout_server::build_router;

#[derive(Parser)]
#[command(name = "hackscout-server", about = "Hackathon page enrichment API")]
struct Cli {
    /// Override WEB_HOST
    #[arg(long)]
    host: Option<String>,

    /// Override WEB_PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    let pipeline = Arc::new(Pipeline::from_config(&config));
    let app = build_router(pipeline);

    let host = cli.host.unwrap_or_else(|| config.web_host.clone());
    let port = cli.port.unwrap_or(config.web_port);
    let addr = format!("{host}:{port}");
    info!("hackscout-server starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
