use clap::Parser;
use docchat_server::config::AppConfig;
use docchat_server::startup;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "docchat-server", about = "Streams Gemini answers about a single document")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Document to answer questions about (PDF or plain text)
    #[arg(short, long)]
    document: Option<PathBuf>,

    /// HTTP server address
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// Gemini model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Per-request streaming timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Drop the text after the last word boundary instead of sending it
    #[arg(long)]
    drop_remainder: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = dotenvy::dotenv() {
        warn!(error = %e, ".env file not loaded");
    }

    let args = Args::parse();

    // Load config from file or use defaults
    let mut config = match &args.config {
        Some(config_path) => AppConfig::load_from_file(config_path),
        None => AppConfig::load_from_default(),
    }
    .map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    // Update config from CLI args
    if let Some(document) = args.document {
        config.document_path = document;
    }
    if let Some(http_addr) = args.http_addr {
        config.http_addr = http_addr;
    }
    if let Some(model) = args.model {
        config.gemini.model_name = model;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        config.request_timeout_secs = timeout_secs;
    }
    if args.drop_remainder {
        config.flush_remainder = false;
    }

    startup::run(config).await
}
