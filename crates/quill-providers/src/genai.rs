//! Google Generative AI (Gemini) client.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use quill_core::config::GenAiConfig;
use quill_core::types::{AnalysisResult, ProviderKind};

use crate::client::AnalysisCore;
use crate::error::{BackendError, ProviderError};
use crate::http::{api_key_from_env, build_client, join_url, send_json};
use crate::retry::RetryPolicy;
use crate::stats::ApiStats;
use crate::traits::ProviderClient;

const NAME: &str = ProviderKind::GoogleGenai.as_str();

/// Public Generative Language API base.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Calls `models/{model}:generateContent` with an `x-goog-api-key` header.
pub struct GenAiClient {
    http: reqwest::Client,
    config: GenAiConfig,
    endpoint: String,
    api_key: String,
    core: AnalysisCore,
}

impl std::fmt::Debug for GenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAiClient")
            .field("model", &self.config.model)
            .field("project", &self.config.project)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl GenAiClient {
    pub fn new(config: &GenAiConfig) -> Result<Self, ProviderError> {
        let api_key = api_key_from_env(NAME, &config.api_key_env)?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(
        config: &GenAiConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http: build_client(NAME)?,
            config: config.clone(),
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
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

    fn generate_url(&self) -> String {
        join_url(
            &self.endpoint,
            &format!("models/{}:generateContent", self.config.model),
        )
    }

    async fn generate(&self, prompt: String) -> Result<String, BackendError> {
        let body = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.config.call.max_tokens,
                temperature: self.config.call.temperature,
            },
        };

        let mut request = self
            .http
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        if let Some(ref project) = self.config.project {
            request = request.header("x-goog-user-project", project);
        }
        let response: GenerateResponse = send_json(NAME, request).await?;

        let Some(candidate) = response.candidates.into_iter().next() else {
            let feedback = response
                .prompt_feedback
                .map(|f| f.to_string())
                .unwrap_or_default();
            return Err(BackendError::new(format!(
                "response contained no candidates {feedback}"
            )));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(BackendError::new(format!(
                "candidate contained no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("?")
            )));
        }
        Ok(text)
    }
}

#[async_trait]
impl ProviderClient for GenAiClient {
    fn name(&self) -> &str {
        NAME
    }

    async fn try_analyze(
        &self,
        source: &str,
        content: &str,
    ) -> Result<AnalysisResult, ProviderError> {
        self.core
            .analyze(source, content, move |prompt| self.generate(prompt))
            .await
    }

    async fn test_connection(&self) -> bool {
        self.core
            .test_connection(move |prompt| self.generate(prompt))
            .await
    }

    fn provider_info(&self) -> BTreeMap<String, String> {
        let call = &self.config.call;
        let mut info = BTreeMap::from([
            ("provider".to_string(), NAME.to_string()),
            ("model".to_string(), self.config.model.clone()),
            ("location".to_string(), self.config.location.clone()),
            ("endpoint".to_string(), self.endpoint.clone()),
            ("max_tokens".to_string(), call.max_tokens.to_string()),
            ("temperature".to_string(), call.temperature.to_string()),
            ("timeout".to_string(), format!("{}s", call.timeout)),
            ("max_retries".to_string(), call.max_retries.to_string()),
        ]);
        if let Some(ref project) = self.config.project {
            info.insert("project".to_string(), project.clone());
        }
        info
    }

    fn stats(&self) -> ApiStats {
        self.core.stats()
    }

    fn reset_stats(&self) {
        self.core.reset_stats();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ErrorKind;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/models/gemini-1.5-flash:generateContent";

    fn config(endpoint: &str, project: Option<&str>) -> GenAiConfig {
        let mut config = GenAiConfig {
            endpoint: Some(endpoint.to_string()),
            project: project.map(String::from),
            ..Default::default()
        };
        config.call.rate_limit_delay = 0.0;
        config
    }

    fn client(server: &MockServer, project: Option<&str>) -> GenAiClient {
        GenAiClient::with_api_key(&config(&server.uri(), project), "g-key")
            .unwrap()
            .with_retry_policy(
                RetryPolicy::new(2)
                    .without_jitter()
                    .with_base_delay(Duration::from_millis(10)),
            )
    }

    fn candidate(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })
    }

    #[test]
    fn test_default_endpoint() {
        let c = GenAiClient::with_api_key(&GenAiConfig::default(), "k").unwrap();
        assert_eq!(
            c.generate_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert!(!c.provider_info().contains_key("project"));
    }

    #[tokio::test]
    async fn test_generate_success_with_project() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "g-key"))
            .and(header("x-goog-user-project", "journal-prod"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": { "maxOutputTokens": 1000 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate(
                "```\n{\"projects\": [\"Quill\"], \"themes\": [\"Growth\", \"growth\"]}\n```",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let c = client(&server, Some("journal-prod"));
        let result = c.try_analyze("d.md", "Quill planning").await.unwrap();
        assert_eq!(result.provider, "google_genai");
        assert_eq!(result.entities.projects, vec!["Quill"]);
        assert_eq!(result.entities.themes, vec!["Growth"]);
        assert_eq!(c.provider_info()["project"], "journal-prod");
    }

    #[tokio::test]
    async fn test_resource_exhausted_is_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED" }
            })))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate("{}")))
            .mount(&server)
            .await;

        let c = client(&server, None);
        let result = c.try_analyze("x", "entry").await.unwrap();
        assert!(result.entities.is_empty());
        assert!(!result.is_degraded());
        assert_eq!(c.stats().rate_limit_hits, 2);
    }

    #[tokio::test]
    async fn test_permission_denied_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": { "code": 403, "message": "Permission denied", "status": "PERMISSION_DENIED" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, None).try_analyze("x", "entry").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn test_blocked_prompt_has_no_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&server)
            .await;

        let c = client(&server, None);
        let err = c.try_analyze("x", "entry").await.unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
        assert!(!c.test_connection().await);
    }
}
