//! Shared analysis plumbing for provider clients.
//!
//! [`AnalysisCore`] owns everything a provider needs besides its transport:
//! prompt building, pacing, per-attempt timeout, retry/backoff, stats, and
//! turning model text into a deduplicated [`AnalysisResult`]. A provider
//! supplies only an `invoke(prompt) -> text` future.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use quill_core::config::CallSettings;
use quill_core::types::AnalysisResult;

use crate::dedup::dedup_entities;
use crate::error::{BackendError, ProviderError};
use crate::parse::parse_response;
use crate::prompt::build_prompt;
use crate::retry::{Pacer, RetryError, RetryPolicy};
use crate::stats::{ApiStats, StatsTracker};

/// Prompt used by `test_connection`.
pub const PING_PROMPT: &str = "Reply with the single word OK.";

/// Prompt, retry, parse and stats helper composed into every provider client.
#[derive(Debug)]
pub struct AnalysisCore {
    provider: &'static str,
    retry: RetryPolicy,
    timeout: Duration,
    pacer: Pacer,
    stats: StatsTracker,
    cancel: CancellationToken,
}

impl AnalysisCore {
    pub fn new(provider: &'static str, call: &CallSettings) -> Self {
        let rate_limit_delay = Duration::try_from_secs_f64(call.rate_limit_delay.max(0.0))
            .unwrap_or(Duration::ZERO);
        Self {
            provider,
            retry: RetryPolicy::new(call.max_retries),
            timeout: Duration::from_secs(call.timeout.max(1)),
            pacer: Pacer::new(rate_limit_delay),
            stats: StatsTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the retry policy (tests use this to drop jitter).
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Abort in-flight attempts and backoff sleeps when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn stats(&self) -> ApiStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Prompt → backend (with retries) → parse → dedup.
    pub async fn analyze<F, Fut>(
        &self,
        source: &str,
        content: &str,
        invoke: F,
    ) -> Result<AnalysisResult, ProviderError>
    where
        F: Fn(String) -> Fut + Send + Sync,
        Fut: Future<Output = Result<String, BackendError>> + Send,
    {
        let prompt = build_prompt(content);
        debug!(
            provider = self.provider,
            source,
            prompt_chars = prompt.len(),
            "Analyzing entry"
        );

        let started = Instant::now();
        let ticket = self.stats.begin_call();
        let outcome = self.call(&prompt, &self.retry, &invoke).await;
        let elapsed = started.elapsed();
        self.stats.finish_call(ticket, outcome.is_ok(), elapsed);

        let text = outcome?;
        match parse_response(&text) {
            Ok(raw) => {
                let entities = dedup_entities(&raw);
                debug!(
                    provider = self.provider,
                    source,
                    entities = entities.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Analysis complete"
                );
                Ok(AnalysisResult::new(source, self.provider, entities, elapsed)
                    .with_raw_response(text))
            }
            Err(e) => {
                warn!(provider = self.provider, source, error = %e, "Unparseable model response");
                Ok(AnalysisResult::degraded(source, self.provider, elapsed, e))
            }
        }
    }

    /// Single attempt with [`PING_PROMPT`]; `true` if the backend answered.
    pub async fn test_connection<F, Fut>(&self, invoke: F) -> bool
    where
        F: Fn(String) -> Fut + Send + Sync,
        Fut: Future<Output = Result<String, BackendError>> + Send,
    {
        let single = RetryPolicy {
            max_retries: 0,
            ..self.retry.clone()
        };

        let started = Instant::now();
        let ticket = self.stats.begin_call();
        let outcome = self.call(PING_PROMPT, &single, &invoke).await;
        self.stats.finish_call(ticket, outcome.is_ok(), started.elapsed());

        match outcome {
            Ok(_) => true,
            Err(e) => {
                warn!(provider = self.provider, error = %e, "Connection test failed");
                false
            }
        }
    }

    async fn call<F, Fut>(
        &self,
        prompt: &str,
        policy: &RetryPolicy,
        invoke: &F,
    ) -> Result<String, ProviderError>
    where
        F: Fn(String) -> Fut + Send + Sync,
        Fut: Future<Output = Result<String, BackendError>> + Send,
    {
        let timeout = self.timeout;
        policy
            .execute(&self.stats, &self.cancel, |attempt| {
                let prompt = prompt.to_string();
                async move {
                    self.pacer.wait().await;
                    debug!(provider = self.provider, attempt = attempt + 1, "Invoking backend");
                    match tokio::time::timeout(timeout, invoke(prompt)).await {
                        Ok(result) => result,
                        Err(_) => Err(BackendError::timeout(format!(
                            "request timed out after {}s",
                            timeout.as_secs()
                        ))),
                    }
                }
            })
            .await
            .map_err(|e| match e {
                RetryError::Failed {
                    kind,
                    attempts,
                    error,
                } => ProviderError::Request {
                    provider: self.provider.to_string(),
                    kind,
                    attempts,
                    source: error,
                },
                RetryError::Cancelled { .. } => ProviderError::Cancelled {
                    provider: self.provider.to_string(),
                },
            })
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
