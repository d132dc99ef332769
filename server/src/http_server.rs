use crate::config::AppConfig;
use crate::relay::{self, RelayOptions};
use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use docchat_core::{
    FragmentProvider, GeminiError, PromptComposer, PromptError, PromptInput, Turn,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn, Span};
use uuid::Uuid;

/// Application state shared with all routes
#[derive(Clone)]
pub struct AppState {
    composer: Arc<PromptComposer>,
    provider: Arc<dyn FragmentProvider>,
    relay: RelayOptions,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        document: Arc<str>,
        provider: Arc<dyn FragmentProvider>,
    ) -> Self {
        Self {
            composer: Arc::new(PromptComposer::new(
                document,
                config.gemini.system_prompt.clone(),
            )),
            provider,
            relay: RelayOptions {
                timeout: config.request_timeout(),
                flush_remainder: config.flush_remainder,
            },
        }
    }
}

/// Query string of the single-question form
#[derive(Deserialize)]
pub struct ChatQuery {
    q: Option<String>,
}

/// JSON body of the conversation form
#[derive(Deserialize)]
pub struct ChatPayload {
    history: Vec<Turn>,
}

/// Body of every 500, upstream details stay in the log
const UPSTREAM_FAILURE: &str = "Failed to start model stream";

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Errors raised before the response stream is opened
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Failed to start model stream: {0}")]
    Upstream(#[from] GeminiError),
}

impl From<PromptError> for ApiError {
    fn from(e: PromptError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => {
                warn!(error = %message, "Rejected chat request");
                (StatusCode::BAD_REQUEST, message)
            }
            Self::Upstream(e) => {
                error!(error = %e, "Failed to open provider stream");
                (StatusCode::INTERNAL_SERVER_ERROR, UPSTREAM_FAILURE.to_string())
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Builds the router: `/chat` for streaming answers and `/` for health checks
pub fn router(state: AppState) -> Router {
    // Credentials rule out wildcards, so origin and headers echo the request
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Router::new()
        .route("/", get(health))
        .route("/chat", get(chat_query).post(chat_history))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server
pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server failed: {}", e))?;

    info!("HTTP server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Health check handler
async fn health() -> impl IntoResponse {
    "docchat is running"
}

/// `GET /chat?q=...`
async fn chat_query(
    State(state): State<AppState>,
    Query(query): Query<ChatQuery>,
) -> Result<Response, ApiError> {
    stream_chat(&state, PromptInput::from_query(query.q)).await
}

/// `POST /chat` with `{"history": [...]}`
async fn chat_history(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let payload: ChatPayload = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?;
    stream_chat(&state, PromptInput::from_history(payload.history)).await
}

#[tracing::instrument(name = "chat", skip_all, fields(request_id = %Uuid::new_v4()))]
async fn stream_chat(state: &AppState, input: PromptInput) -> Result<Response, ApiError> {
    let turns = state.composer.compose(input)?;
    info!(turns = turns.len(), "Composed prompt");

    let deadline = state.relay.deadline();
    let fragments = tokio::time::timeout_at(deadline, state.provider.stream(&turns))
        .await
        .map_err(|_| GeminiError::Timeout(state.relay.timeout.as_secs()))??;
    let chunks = relay::chunk_stream(fragments, state.relay, deadline, Span::current());

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(chunks),
    )
        .into_response())
}
