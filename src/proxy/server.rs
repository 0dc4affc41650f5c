//! HTTP server setup and configuration.

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::backend::GeminiBackend;
use crate::config::Config;

/// Shared application state.
///
/// Everything here is immutable for the lifetime of the process; concurrent
/// inbound requests share it without synchronization.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<GeminiBackend>,
    pub config: Arc<Config>,
}

/// CORS policy matching the inbound surface contract: any origin, GET/POST/
/// OPTIONS, content-type and authorization headers. Preflight OPTIONS
/// requests are answered by this layer.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // OpenAI-compatible endpoints, with and without the /v1 prefix
        .route("/chat/completions", post(handlers::chat_completions))
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .route("/models", get(handlers::list_models))
        .route("/v1/models", get(handlers::list_models))
        // Liveness
        .route("/", get(handlers::root))
        .fallback(handlers::not_found)
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

/// Run the HTTP server.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();

    let backend = GeminiBackend::new(&config)?;

    let state = AppState {
        backend: Arc::new(backend),
        config: Arc::new(config),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Starting gembridge proxy server");

    axum::serve(listener, app).await?;

    Ok(())
}
