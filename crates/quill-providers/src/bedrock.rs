//! Amazon Bedrock client using the Converse API with a Bedrock API key.
//!
//! Requests go to `POST {endpoint}/model/{modelId}/converse` with
//! `Authorization: Bearer <key>`. The default endpoint is the regional
//! `bedrock-runtime` host.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use quill_core::config::BedrockConfig;
use quill_core::types::{AnalysisResult, ProviderKind};

use crate::client::AnalysisCore;
use crate::error::{BackendError, ProviderError};
use crate::http::{api_key_from_env, build_client, join_url, send_json};
use crate::retry::RetryPolicy;
use crate::stats::ApiStats;
use crate::traits::ProviderClient;

const NAME: &str = ProviderKind::Bedrock.as_str();

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConverseRequest<'a> {
    messages: [ConverseMessage<'a>; 1],
    inference_config: InferenceConfig,
}

#[derive(Serialize)]
struct ConverseMessage<'a> {
    role: &'static str,
    content: [TextBlock<'a>; 1],
}

#[derive(Serialize)]
struct TextBlock<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InferenceConfig {
    max_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseResponse {
    output: ConverseOutput,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ConverseOutput {
    message: OutputMessage,
}

#[derive(Deserialize)]
struct OutputMessage {
    #[serde(default)]
    content: Vec<OutputBlock>,
}

#[derive(Deserialize)]
struct OutputBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Bedrock Converse client.
pub struct BedrockClient {
    http: reqwest::Client,
    config: BedrockConfig,
    endpoint: String,
    api_key: String,
    core: AnalysisCore,
}

impl std::fmt::Debug for BedrockClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BedrockClient")
            .field("region", &self.config.region)
            .field("model_id", &self.config.model_id)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl BedrockClient {
    pub fn new(config: &BedrockConfig) -> Result<Self, ProviderError> {
        let api_key = api_key_from_env(NAME, &config.api_key_env)?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(
        config: &BedrockConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", config.region));
        Ok(Self {
            http: build_client(NAME)?,
            config: config.clone(),
            endpoint,
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

    fn converse_url(&self) -> String {
        join_url(
            &self.endpoint,
            &format!("model/{}/converse", self.config.model_id),
        )
    }

    async fn converse(&self, prompt: String) -> Result<String, BackendError> {
        let body = ConverseRequest {
            messages: [ConverseMessage {
                role: "user",
                content: [TextBlock { text: &prompt }],
            }],
            inference_config: InferenceConfig {
                max_tokens: self.config.call.max_tokens,
                temperature: self.config.call.temperature,
            },
        };

        let request = self
            .http
            .post(self.converse_url())
            .bearer_auth(&self.api_key)
            .json(&body);
        let response: ConverseResponse = send_json(NAME, request).await?;

        let text: String = response
            .output
            .message
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect();
        if text.is_empty() {
            return Err(BackendError::new(format!(
                "response contained no text (stop reason: {})",
                response.stop_reason.as_deref().unwrap_or("?")
            )));
        }
        Ok(text)
    }
}

#[async_trait]
impl ProviderClient for BedrockClient {
    fn name(&self) -> &str {
        NAME
    }

    async fn try_analyze(
        &self,
        source: &str,
        content: &str,
    ) -> Result<AnalysisResult, ProviderError> {
        self.core
            .analyze(source, content, move |prompt| self.converse(prompt))
            .await
    }

    async fn test_connection(&self) -> bool {
        self.core
            .test_connection(move |prompt| self.converse(prompt))
            .await
    }

    fn provider_info(&self) -> BTreeMap<String, String> {
        let call = &self.config.call;
        BTreeMap::from([
            ("provider".to_string(), NAME.to_string()),
            ("model".to_string(), self.config.model_id.clone()),
            ("region".to_string(), self.config.region.clone()),
            ("endpoint".to_string(), self.endpoint.clone()),
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
