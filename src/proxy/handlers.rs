//! HTTP request handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use super::resolver::resolve_with_fallback;
use super::server::AppState;
use super::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::error::Error;

/// `created` timestamp reported for every model in the listing; the backend
/// does not publish release dates, so the value is a fixed epoch.
const MODEL_CREATED_EPOCH: u64 = 1_677_610_602;

/// Handle POST /chat/completions and /v1/chat/completions.
///
/// Pipeline: credential gate, request translation, fallback resolution,
/// response translation. The credential is checked first so a missing key
/// never produces an outbound call.
pub async fn chat_completions(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ChatCompletionResponse>, Error> {
    state.backend.require_key()?;

    let request = ChatCompletionRequest::from_value(&body)?;
    let prompt = request.prompt();

    tracing::info!(
        messages = request.messages.len(),
        requested_model = ?request.model,
        "Received chat completion request"
    );

    let generated = resolve_with_fallback(&state.config.candidates, |candidate| {
        let backend = state.backend.clone();
        let candidate = candidate.clone();
        let prompt = prompt.clone();
        async move { backend.generate(&candidate, &prompt).await }
    })
    .await?;

    tracing::info!(model = %generated.model, "Chat completion succeeded");

    Ok(Json(ChatCompletionResponse::from_generated(generated)))
}

/// Handle GET /models and /v1/models.
///
/// The listing is the candidate models in fallback priority order.
pub async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    let models: Vec<serde_json::Value> = state
        .config
        .candidates
        .iter()
        .map(|candidate| {
            serde_json::json!({
                "id": candidate.model,
                "object": "model",
                "created": MODEL_CREATED_EPOCH,
                "owned_by": "google",
            })
        })
        .collect();

    Json(serde_json::json!({
        "object": "list",
        "data": models
    }))
}

/// Handle GET /, the liveness status endpoint.
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "gembridge is running",
        "endpoints": ["GET /v1/models", "POST /v1/chat/completions"]
    }))
}

/// Fallback handler for unmatched routes.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Endpoint not found" })),
    )
}
