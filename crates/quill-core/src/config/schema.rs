//! Configuration schema.
//!
//! Hierarchy: `Config` → `LlmConfig` (provider selection + one settings block
//! per provider), `DatabaseConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! Provider selection fields are `Option`s so the resolver can tell "set in the
//! file" apart from "not set" when layering CLI, file, and env values.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.quill/config.json`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub llm: LlmConfig,
    pub database: DatabaseConfig,
}

/// Location of the entry database shared with the dashboard.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

// ─────────────────────────────────────────────
// LLM
// ─────────────────────────────────────────────

/// Provider selection plus per-provider settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmConfig {
    /// Primary provider name (`"bedrock"`, `"google_genai"`, `"cborg"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Ordered providers to try after the primary fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_providers: Option<Vec<String>>,
    pub bedrock: BedrockConfig,
    pub google_genai: GenAiConfig,
    pub cborg: CborgConfig,
}

/// Settings shared by every provider's call path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallSettings {
    /// Per-attempt timeout in seconds.
    pub timeout: u64,
    /// Retries after the first attempt (total attempts = `max_retries + 1`).
    pub max_retries: u32,
    /// Minimum spacing between requests, in seconds.
    pub rate_limit_delay: f64,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

impl Default for CallSettings {
    fn default() -> Self {
        Self {
            timeout: 60,
            max_retries: 3,
            rate_limit_delay: 1.0,
            max_tokens: 1000,
            temperature: 0.1,
        }
    }
}

/// Amazon Bedrock settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BedrockConfig {
    pub region: String,
    pub model_id: String,
    /// Overrides `https://bedrock-runtime.{region}.amazonaws.com`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Name of the env var holding the Bedrock API key.
    pub api_key_env: String,
    #[serde(flatten)]
    pub call: CallSettings,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            model_id: "anthropic.claude-3-5-sonnet-20240620-v1:0".to_string(),
            endpoint: None,
            api_key_env: "AWS_BEARER_TOKEN_BEDROCK".to_string(),
            call: CallSettings::default(),
        }
    }
}

/// Google Generative AI (Gemini) settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenAiConfig {
    /// Billing/quota project, sent as `x-goog-user-project` when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub location: String,
    pub model: String,
    /// Overrides `https://generativelanguage.googleapis.com/v1beta`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub api_key_env: String,
    #[serde(flatten)]
    pub call: CallSettings,
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            project: None,
            location: "us-central1".to_string(),
            model: "gemini-1.5-flash".to_string(),
            endpoint: None,
            api_key_env: "GOOGLE_API_KEY".to_string(),
            call: CallSettings::default(),
        }
    }
}

/// CBORG (OpenAI-compatible gateway) settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CborgConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    #[serde(flatten)]
    pub call: CallSettings,
}

impl Default for CborgConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.cborg.lbl.gov".to_string(),
            model: "lbl/cborg-chat:latest".to_string(),
            api_key_env: "CBORG_API_KEY".to_string(),
            call: CallSettings::default(),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.llm.provider.is_none());
        assert!(config.llm.fallback_providers.is_none());
        assert_eq!(config.llm.bedrock.region, "us-east-1");
        assert_eq!(config.llm.bedrock.call.max_retries, 3);
        assert_eq!(config.llm.cborg.api_key_env, "CBORG_API_KEY");
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_config_from_json_camel_case() {
        let json = serde_json::json!({
            "llm": {
                "provider": "google_genai",
                "fallbackProviders": ["cborg"],
                "googleGenai": {
                    "project": "journal-123",
                    "model": "gemini-2.0-flash",
                    "maxRetries": 5,
                    "rateLimitDelay": 0.5
                },
                "bedrock": {
                    "modelId": "anthropic.claude-3-haiku",
                    "apiKeyEnv": "MY_BEDROCK_KEY"
                }
            },
            "database": { "path": "/tmp/journal.db" }
        });

        let config: Config = serde_json::from_value(json).unwrap();
        assert_eq!(config.llm.provider.as_deref(), Some("google_genai"));
        assert_eq!(config.llm.fallback_providers, Some(vec!["cborg".to_string()]));
        assert_eq!(config.llm.google_genai.project.as_deref(), Some("journal-123"));
        assert_eq!(config.llm.google_genai.call.max_retries, 5);
        assert_eq!(config.llm.google_genai.call.rate_limit_delay, 0.5);
        // Unset fields keep their defaults
        assert_eq!(config.llm.google_genai.call.timeout, 60);
        assert_eq!(config.llm.google_genai.location, "us-central1");
        assert_eq!(config.llm.bedrock.api_key_env, "MY_BEDROCK_KEY");
        assert_eq!(config.database.path.as_deref(), Some("/tmp/journal.db"));
    }

    #[test]
    fn test_serialize_camel_case() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert!(json["llm"]["bedrock"].get("modelId").is_some());
        assert!(json["llm"]["bedrock"].get("maxRetries").is_some());
        assert!(json["llm"].get("googleGenai").is_some());
        assert!(json["llm"].get("provider").is_none());
    }
}
