//! OpenAI-compatible request and response types, and the translation
//! between them and the backend's prompt/text shapes.

use serde::{Deserialize, Serialize};

use crate::backend::GeneratedText;
use crate::error::Error;

/// Message role. The wire format admits exactly these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A chat message. Ordering within a request is conversation order and is
/// preserved by the prompt flattening.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Chat completion request (OpenAI-compatible).
#[derive(Debug, Clone)]
pub struct ChatCompletionRequest {
    pub messages: Vec<ChatMessage>,
    /// Accepted for OpenAI-client compatibility and ignored: the configured
    /// candidate list, not the caller, chooses the backend model.
    pub model: Option<String>,
}

impl ChatCompletionRequest {
    /// Build a request from a raw JSON body.
    ///
    /// Fails with `Error::Validation` (HTTP 400) when `messages` is absent,
    /// not an array, empty, or contains a malformed message.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, Error> {
        let messages = value
            .get("messages")
            .ok_or_else(|| Error::Validation("No messages provided".to_string()))?;

        let array = messages
            .as_array()
            .ok_or_else(|| Error::Validation("'messages' must be an array".to_string()))?;

        if array.is_empty() {
            return Err(Error::Validation("No messages provided".to_string()));
        }

        let messages: Vec<ChatMessage> = serde_json::from_value(messages.clone())
            .map_err(|e| Error::Validation(format!("Invalid message: {}", e)))?;

        let model = value
            .get("model")
            .and_then(|m| m.as_str())
            .map(|m| m.to_string());

        Ok(Self { messages, model })
    }

    /// Flatten the conversation into a single prompt: each message rendered
    /// as `"<role>: <content>"`, joined with newlines in original order.
    ///
    /// Lossy but deterministic; no structured roles reach the backend.
    pub fn prompt(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Chat completion response (OpenAI-compatible).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

/// A completion choice.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Choice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: String,
}

/// Token usage statistics.
///
/// The backend does not report token counts and no local tokenizer is used,
/// so all counters are fixed at zero. Known accuracy gap, kept deliberately.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl ChatCompletionResponse {
    /// Wrap generated text in the OpenAI completion shape.
    ///
    /// `model` is the endpoint that actually produced the text, never a
    /// stale default.
    pub fn from_generated(generated: GeneratedText) -> Self {
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            object: "chat.completion".to_string(),
            created: chrono::Utc::now().timestamp() as u64,
            model: generated.model,
            choices: vec![Choice {
                index: 0,
                message: ChatMessage {
                    role: Role::Assistant,
                    content: generated.text,
                },
                finish_reason: "stop".to_string(),
            }],
            usage: Usage {
                prompt_tokens: 0,
                completion_tokens: 0,
                total_tokens: 0,
            },
        }
    }
}
