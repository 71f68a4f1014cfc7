//! Provider client trait — the contract every LLM backend implements.
//!
//! Concrete providers (`BedrockClient`, `GenAiClient`, `CborgClient`) each
//! implement this trait directly and share their prompt/retry/parse/stats
//! plumbing through [`crate::client::AnalysisCore`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use quill_core::types::AnalysisResult;
use tokio::time::Instant;

use crate::error::ProviderError;
use crate::stats::ApiStats;

/// Trait that all LLM provider clients implement.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Registry name (e.g. `"bedrock"`).
    fn name(&self) -> &str;

    /// Analyze one journal entry, reporting backend failure explicitly.
    ///
    /// A response that cannot be parsed is *not* an error: it comes back as
    /// `Ok` with empty entity lists and a diagnostic in `raw_response`.
    /// `Err` means the backend itself failed after local retries.
    async fn try_analyze(&self, source: &str, content: &str)
        -> Result<AnalysisResult, ProviderError>;

    /// Analyze one journal entry. Never fails; backend errors degrade to an
    /// empty result whose `raw_response` starts with `"Error: "`.
    async fn analyze(&self, source: &str, content: &str) -> AnalysisResult {
        let started = Instant::now();
        match self.try_analyze(source, content).await {
            Ok(result) => result,
            Err(e) => AnalysisResult::degraded(source, self.name(), started.elapsed(), e),
        }
    }

    /// One minimal round-trip. `false` on any failure.
    async fn test_connection(&self) -> bool;

    /// Static description: provider, model, region/project/endpoint, ...
    fn provider_info(&self) -> BTreeMap<String, String>;

    fn stats(&self) -> ApiStats;

    fn reset_stats(&self);
}
