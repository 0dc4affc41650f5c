//! Configuration parsing and validation for gembridge.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

/// Environment variable consulted when no `api_key` is set in the config file.
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    /// Candidate endpoints in fallback priority order. Declaration order is
    /// attempt order: most capable model first, legacy API version last.
    #[serde(default = "default_candidates")]
    pub candidates: Vec<CandidateConfig>,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:8080")
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Upstream Generative Language API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the Generative Language API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API credential. Falls back to `$GEMINI_API_KEY` when absent.
    pub api_key: Option<ApiKey>,
    /// Per-attempt timeout in seconds. Bounds worst-case request latency
    /// at `request_timeout_secs * candidates.len()`.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// One backend endpoint candidate: a (model, API version) pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CandidateConfig {
    /// Backend model identifier (e.g., "gemini-1.5-pro")
    pub model: String,
    /// API version path segment (e.g., "v1beta", "v1")
    pub api_version: String,
}

fn default_candidates() -> Vec<CandidateConfig> {
    vec![
        CandidateConfig {
            model: "gemini-1.5-pro".to_string(),
            api_version: "v1beta".to_string(),
        },
        CandidateConfig {
            model: "gemini-1.5-flash".to_string(),
            api_version: "v1beta".to_string(),
        },
        CandidateConfig {
            model: "gemini-pro".to_string(),
            api_version: "v1".to_string(),
        },
    ]
}

/// Generation parameters sent with every backend call.
///
/// Constant per deployment; never derived from the inbound request.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    2048
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// API key wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
///
/// The inner `SecretString` ensures the key value is:
/// - Zeroized in memory when dropped
/// - Never exposed via Debug or Display
/// - Only accessible via `.expose_secret()` (grep-auditable)
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Access the raw key value. Every call site is auditable via `grep expose_secret`.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> serde::Deserialize<'de> for ApiKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| ApiKey(SecretString::from(s)))
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::parse_str(&content)
    }

    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist so the proxy can run on environment config alone.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::info!(
                path = %path.as_ref().display(),
                "Config file not found, using defaults"
            );
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.base_url.is_empty() {
            return Err(ConfigError::Validation("Backend base URL is empty".into()));
        }

        if self.candidates.is_empty() {
            return Err(ConfigError::Validation(
                "At least one endpoint candidate is required".into(),
            ));
        }

        for candidate in &self.candidates {
            if candidate.model.is_empty() {
                return Err(ConfigError::Validation(
                    "Candidate has empty model identifier".into(),
                ));
            }
            if candidate.api_version.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Candidate '{}' has empty API version",
                    candidate.model
                )));
            }
        }

        Ok(())
    }

    /// Resolve the backend credential: config literal first, then the
    /// `GEMINI_API_KEY` environment variable.
    ///
    /// Returns `None` when neither is set; requests then fail with a 500
    /// before any outbound call is attempted.
    pub fn resolve_api_key(&self) -> Option<ApiKey> {
        if let Some(key) = &self.backend.api_key {
            return Some(key.clone());
        }
        std::env::var(API_KEY_ENV_VAR).ok().map(ApiKey::from)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            backend: BackendConfig::default(),
            candidates: default_candidates(),
            generation: GenerationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = Config::parse_str("").unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert_eq!(
            config.backend.base_url,
            "https://generativelanguage.googleapis.com"
        );
        assert_eq!(config.backend.request_timeout_secs, 30);
        assert_eq!(config.generation.temperature, 0.7);
        assert_eq!(config.generation.max_output_tokens, 2048);
    }

    #[test]
    fn test_default_candidates_priority_order() {
        let config = Config::default();
        let models: Vec<&str> = config.candidates.iter().map(|c| c.model.as_str()).collect();
        assert_eq!(
            models,
            vec!["gemini-1.5-pro", "gemini-1.5-flash", "gemini-pro"]
        );
        // Legacy API version comes last
        assert_eq!(config.candidates.last().unwrap().api_version, "v1");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [server]
            listen = "0.0.0.0:9000"

            [backend]
            base_url = "http://127.0.0.1:4000"
            api_key = "test-key"
            request_timeout_secs = 10

            [[candidates]]
            model = "gemini-1.5-pro"
            api_version = "v1beta"

            [[candidates]]
            model = "gemini-pro"
            api_version = "v1"

            [generation]
            temperature = 0.2
            max_output_tokens = 512

            [logging]
            level = "debug"
        "#;

        let config = Config::parse_str(toml).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:9000");
        assert_eq!(config.backend.base_url, "http://127.0.0.1:4000");
        assert_eq!(config.backend.request_timeout_secs, 10);
        assert_eq!(config.candidates.len(), 2);
        assert_eq!(config.candidates[0].model, "gemini-1.5-pro");
        assert_eq!(config.candidates[1].api_version, "v1");
        assert_eq!(config.generation.temperature, 0.2);
        assert_eq!(config.generation.max_output_tokens, 512);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_empty_candidates_rejected() {
        let toml = r#"
            candidates = []
        "#;
        let result = Config::parse_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("candidate"), "unexpected error: {}", err);
    }

    #[test]
    fn test_empty_model_rejected() {
        let toml = r#"
            [[candidates]]
            model = ""
            api_version = "v1"
        "#;
        assert!(Config::parse_str(toml).is_err());
    }

    #[test]
    fn test_empty_api_version_rejected() {
        let toml = r#"
            [[candidates]]
            model = "gemini-pro"
            api_version = ""
        "#;
        let result = Config::parse_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("gemini-pro"), "error should name the candidate");
    }

    #[test]
    fn test_api_key_debug_redaction() {
        let key = ApiKey::from("super-secret-gemini-key");
        let debug_output = format!("{:?}", key);
        assert_eq!(debug_output, "[REDACTED]");
        assert!(!debug_output.contains("super-secret"));
    }

    #[test]
    fn test_api_key_display_redaction() {
        let key = ApiKey::from("super-secret-gemini-key");
        let display_output = format!("{}", key);
        assert_eq!(display_output, "[REDACTED]");
        assert!(!display_output.contains("super-secret"));
    }

    #[test]
    fn test_api_key_serialize_redaction() {
        let key = ApiKey::from("real-secret-value");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"[REDACTED]\"");
        assert!(!json.contains("real-secret"));
    }

    #[test]
    fn test_api_key_expose_secret() {
        let key = ApiKey::from("the-actual-value");
        assert_eq!(key.expose_secret(), "the-actual-value");
    }

    #[test]
    fn test_backend_config_debug_redaction() {
        let toml = r#"
            [backend]
            api_key = "AIzaSyFakeKey1234"
        "#;
        let config = Config::parse_str(toml).unwrap();
        let debug = format!("{:?}", config.backend);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("AIzaSyFakeKey1234"));
    }

    #[test]
    fn test_resolve_api_key_prefers_config_literal() {
        let toml = r#"
            [backend]
            api_key = "config-key"
        "#;
        let config = Config::parse_str(toml).unwrap();
        let key = config.resolve_api_key().unwrap();
        assert_eq!(key.expose_secret(), "config-key");
    }

    #[test]
    fn test_resolve_api_key_env_fallback() {
        // Unique-ish value so a collision with a real key is detectable.
        let var_value = "env-fallback-key-0815";
        unsafe { std::env::set_var(API_KEY_ENV_VAR, var_value) };

        let config = Config::default();
        let key = config.resolve_api_key().unwrap();
        assert_eq!(key.expose_secret(), var_value);

        unsafe { std::env::remove_var(API_KEY_ENV_VAR) };
    }
}
