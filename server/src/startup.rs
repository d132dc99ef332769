//! Everything that has to succeed before the listener binds.

use crate::config::AppConfig;
use crate::http_server::{self, AppState};
use docchat_core::config::API_KEY_ENV;
use docchat_core::{load_document, GeminiClient};
use std::sync::Arc;
use tracing::{error, info};

/// Validates the configuration, loads the document and builds the Gemini
/// client. Any failure here is fatal.
pub fn prepare(config: &AppConfig) -> anyhow::Result<AppState> {
    config.validate().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    // The document is the only context the model gets, nothing can be served without it
    let document = load_document(&config.document_path).map_err(|e| {
        error!(error = %e, "Failed to load document");
        anyhow::anyhow!("Failed to load document: {}", e)
    })?;

    let gemini_config = config.gemini.clone().with_env_api_key();
    let gemini_client = GeminiClient::new(gemini_config).map_err(|e| {
        error!(error = %e, "{} environment variable not set", API_KEY_ENV);
        anyhow::anyhow!("Failed to initialize Gemini client: {}", e)
    })?;
    info!(model = %gemini_client.model_name(), "Initialized Gemini client");

    Ok(AppState::new(config, Arc::from(document), Arc::new(gemini_client)))
}

/// Prepares the server and serves until shutdown
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let state = prepare(&config)?;
    http_server::run_server(state, config.http_addr).await
}
