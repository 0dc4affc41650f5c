//! Google Generative Language API client.
//!
//! Issues a single `generateContent` call per endpoint candidate and
//! classifies the outcome for the fallback resolver.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::{ApiKey, CandidateConfig, Config};
use crate::error::Error;
use crate::proxy::resolver::{AttemptError, AttemptFailure};

/// Request body for the `generateContent` API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Generation parameters, camelCase on the wire.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

/// Response from the `generateContent` API.
///
/// `candidates` defaults to empty so a 2xx body without the array parses
/// cleanly and is classified as a no-candidates outcome.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Text produced by a succeeding endpoint, with source attribution.
#[derive(Debug, Clone)]
pub struct GeneratedText {
    pub text: String,
    /// Model identifier of the endpoint that actually produced the text.
    pub model: String,
}

/// Client for the Generative Language API.
///
/// Holds everything that is constant across requests: the HTTP client with
/// its timeouts, the base URL, the fixed generation parameters, and the
/// credential (injected at construction, never re-read per call).
#[derive(Clone)]
pub struct GeminiBackend {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<ApiKey>,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiBackend {
    /// Build a backend client from configuration.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(
                config.backend.request_timeout_secs,
            ))
            .connect_timeout(std::time::Duration::from_secs(
                config.backend.connect_timeout_secs,
            ))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.backend.base_url.trim_end_matches('/').to_string(),
            api_key: config.resolve_api_key(),
            temperature: config.generation.temperature,
            max_output_tokens: config.generation.max_output_tokens,
        })
    }

    /// Fail with `Error::MissingApiKey` when no credential is configured.
    ///
    /// Called by the handler before the fallback chain starts, so a missing
    /// credential never produces an outbound call.
    pub fn require_key(&self) -> Result<(), Error> {
        if self.api_key.is_none() {
            return Err(Error::MissingApiKey);
        }
        Ok(())
    }

    /// Fully-qualified endpoint URL for one candidate, without the key.
    fn endpoint_url(&self, candidate: &CandidateConfig) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            self.base_url, candidate.api_version, candidate.model
        )
    }

    /// Issue one `generateContent` call for one candidate and classify the
    /// outcome.
    ///
    /// - Transport failure: recoverable, the chain continues
    /// - Non-2xx status: recoverable, body text recorded for diagnostics
    /// - 2xx with missing/empty `candidates`: fatal `NoCandidates`; the
    ///   backend was reachable but produced nothing, which a different
    ///   model endpoint cannot fix
    /// - 2xx without an extractable text part: fatal `Internal`
    pub async fn generate(
        &self,
        candidate: &CandidateConfig,
        prompt: &str,
    ) -> Result<GeneratedText, AttemptError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(AttemptError::Fatal(Error::MissingApiKey))?;

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let url = self.endpoint_url(candidate);
        tracing::debug!(model = %candidate.model, api_version = %candidate.api_version, "Calling backend endpoint");

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", api_key.expose_secret())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AttemptError::Recoverable(AttemptFailure {
                    model: candidate.model.clone(),
                    api_version: candidate.api_version.clone(),
                    status: None,
                    message: e.to_string(),
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(AttemptError::Recoverable(AttemptFailure {
                model: candidate.model.clone(),
                api_version: candidate.api_version.clone(),
                status: Some(status.as_u16()),
                message: error_body,
            }));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            AttemptError::Fatal(Error::Internal(format!(
                "Failed to parse backend response: {}",
                e
            )))
        })?;

        let text = extract_text(parsed)?;
        Ok(GeneratedText {
            text,
            model: candidate.model.clone(),
        })
    }
}

/// Pull the first candidate's first text part out of a parsed response.
fn extract_text(response: GenerateContentResponse) -> Result<String, AttemptError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(AttemptError::Fatal(Error::NoCandidates))?;

    candidate
        .content
        .parts
        .into_iter()
        .find_map(|p| p.text)
        .ok_or_else(|| {
            AttemptError::Fatal(Error::Internal(
                "Backend candidate contained no text part".to_string(),
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_with_base(base_url: &str) -> GeminiBackend {
        let mut config = Config::default();
        config.backend.base_url = base_url.to_string();
        config.backend.api_key = Some(ApiKey::from("test-key"));
        GeminiBackend::new(&config).unwrap()
    }

    fn candidate(model: &str, api_version: &str) -> CandidateConfig {
        CandidateConfig {
            model: model.to_string(),
            api_version: api_version.to_string(),
        }
    }

    #[test]
    fn test_endpoint_url_shape() {
        let backend = backend_with_base("https://generativelanguage.googleapis.com");
        assert_eq!(
            backend.endpoint_url(&candidate("gemini-1.5-pro", "v1beta")),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn test_endpoint_url_trims_trailing_slash() {
        let backend = backend_with_base("http://127.0.0.1:4000/");
        assert_eq!(
            backend.endpoint_url(&candidate("gemini-pro", "v1")),
            "http://127.0.0.1:4000/v1/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn test_request_body_wire_format() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: "user: hi" }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 2048,
            },
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], "user: hi");
        // f32 widening through serde_json is version-dependent; compare approximately
        let temperature = json["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.7).abs() < 1e-6);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn test_extract_text_first_candidate() {
        let parsed: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                {"content": {"parts": [{"text": "hello"}], "role": "model"}},
                {"content": {"parts": [{"text": "ignored"}], "role": "model"}}
            ]
        }))
        .unwrap();
        assert_eq!(extract_text(parsed).unwrap(), "hello");
    }

    #[test]
    fn test_extract_text_empty_candidates_is_fatal() {
        let parsed: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({"candidates": []})).unwrap();
        match extract_text(parsed) {
            Err(AttemptError::Fatal(Error::NoCandidates)) => {}
            other => panic!("expected fatal NoCandidates, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_extract_text_missing_candidates_field_is_fatal() {
        let parsed: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(matches!(
            extract_text(parsed),
            Err(AttemptError::Fatal(Error::NoCandidates))
        ));
    }

    #[test]
    fn test_extract_text_no_text_part_is_fatal_internal() {
        let parsed: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [], "role": "model"}}]
        }))
        .unwrap();
        assert!(matches!(
            extract_text(parsed),
            Err(AttemptError::Fatal(Error::Internal(_)))
        ));
    }

    #[test]
    fn test_require_key_absent() {
        let mut config = Config::default();
        config.backend.api_key = None;
        // Bypass env fallback by clearing the resolved key directly.
        let mut backend = GeminiBackend::new(&config).unwrap();
        backend.api_key = None;
        assert!(matches!(backend.require_key(), Err(Error::MissingApiKey)));
    }

    #[test]
    fn test_require_key_present() {
        let backend = backend_with_base("http://127.0.0.1:4000");
        assert!(backend.require_key().is_ok());
    }
}
