//! CBORG client (Berkeley Lab's OpenAI-compatible LLM gateway).

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use quill_core::config::CborgConfig;
use quill_core::types::{AnalysisResult, ProviderKind};

use crate::client::AnalysisCore;
use crate::error::{BackendError, ProviderError};
use crate::http::{api_key_from_env, build_client, join_url, send_json};
use crate::retry::RetryPolicy;
use crate::stats::ApiStats;
use crate::traits::ProviderClient;

const NAME: &str = ProviderKind::Cborg.as_str();

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Talks to `{endpoint}/chat/completions` with a bearer key.
pub struct CborgClient {
    http: reqwest::Client,
    config: CborgConfig,
    api_key: String,
    core: AnalysisCore,
}

impl std::fmt::Debug for CborgClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CborgClient")
            .field("endpoint", &self.config.endpoint)
            .field("model", &self.config.model)
            .finish()
    }
}

impl CborgClient {
    /// Build from config, reading the key from `config.api_key_env`.
    pub fn new(config: &CborgConfig) -> Result<Self, ProviderError> {
        let api_key = api_key_from_env(NAME, &config.api_key_env)?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(
        config: &CborgConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http: build_client(NAME)?,
            config: config.clone(),
            api_key: api_key.into(),
            core: AnalysisCore::new(NAME, &config.call),
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.core = self.core.with_retry_policy(policy);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.core = self.core.with_cancellation(token);
        self
    }

    fn completions_url(&self) -> String {
        join_url(&self.config.endpoint, "chat/completions")
    }

    async fn complete(&self, prompt: String) -> Result<String, BackendError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: &prompt,
            }],
            max_tokens: self.config.call.max_tokens,
            temperature: self.config.call.temperature,
        };

        let request = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body);
        let response: ChatResponse = send_json(NAME, request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BackendError::new("response contained no message content"))
    }
}

#[async_trait]
impl ProviderClient for CborgClient {
    fn name(&self) -> &str {
        NAME
    }

    async fn try_analyze(
        &self,
        source: &str,
        content: &str,
    ) -> Result<AnalysisResult, ProviderError> {
        self.core
            .analyze(source, content, move |prompt| self.complete(prompt))
            .await
    }

    async fn test_connection(&self) -> bool {
        self.core.test_connection(move |prompt| self.complete(prompt)).await
    }

    fn provider_info(&self) -> BTreeMap<String, String> {
        let call = &self.config.call;
        BTreeMap::from([
            ("provider".to_string(), NAME.to_string()),
            ("model".to_string(), self.config.model.clone()),
            ("endpoint".to_string(), self.config.endpoint.clone()),
            ("max_tokens".to_string(), call.max_tokens.to_string()),
            ("temperature".to_string(), call.temperature.to_string()),
            ("timeout".to_string(), format!("{}s", call.timeout)),
            ("max_retries".to_string(), call.max_retries.to_string()),
        ])
    }

    fn stats(&self) -> ApiStats {
        self.core.stats()
    }

    fn reset_stats(&self) {
        self.core.reset_stats();
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
