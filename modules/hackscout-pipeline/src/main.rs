use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hackscout_common::AppConfig;
use hackscout_pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "hackscout", about = "Enrich a hackathon page into a structured record")]
struct Cli {
    /// Hackathon page to enrich
    url: String,

    /// Extra hashtag to probe (repeatable)
    #[arg(long = "hashtag")]
    hashtags: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays pure JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let pipeline = Pipeline::from_config(&config);

    let record = pipeline
        .run_with_tags(&cli.url, &cli.hashtags)
        .await
        .with_context(|| format!("Failed to enrich {}", cli.url))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({ "data": record }))?
    );

    Ok(())
}
