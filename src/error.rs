//! Error types for gembridge.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::proxy::resolver::AttemptFailure;

/// Result type alias for gembridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for gembridge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("API key not configured in environment variables")]
    MissingApiKey,

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("No response from backend")]
    NoCandidates,

    #[error("All endpoints failed ({} attempted)", attempts.len())]
    AllEndpointsFailed { attempts: Vec<AttemptFailure> },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NoCandidates => StatusCode::INTERNAL_SERVER_ERROR,
            Error::AllEndpointsFailed { .. } => StatusCode::NOT_FOUND,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // OpenAI-compatible error envelope; exhaustion carries the full
        // per-endpoint failure trail for caller-visible diagnostics.
        let mut error = serde_json::json!({
            "message": self.to_string(),
            "type": "gembridge_error",
            "code": status.as_u16()
        });
        if let Error::AllEndpointsFailed { attempts } = &self {
            error["attempts"] = serde_json::json!(attempts);
        }

        (status, axum::Json(serde_json::json!({ "error": error }))).into_response()
    }
}
