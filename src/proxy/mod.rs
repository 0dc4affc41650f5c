//! HTTP proxy server module.
//!
//! This module provides the OpenAI-compatible HTTP API that accepts chat
//! requests and forwards them through the endpoint fallback chain.

mod handlers;
pub mod resolver;
mod server;
pub mod types;

pub use server::{create_router, run_server, AppState};
pub use types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Role};
