//! LLM provider layer for Quill.
//!
//! Turns a journal entry into an [`AnalysisResult`](quill_core::types::AnalysisResult)
//! by asking one of several interchangeable LLM backends.
//!
//! # Architecture
//!
//! - [`traits::ProviderClient`] — trait that all providers implement
//! - [`client::AnalysisCore`] — prompt, retry, parse, dedup and stats shared by every provider
//! - [`bedrock`], [`genai`], [`cborg`] — the concrete HTTP backends
//! - [`registry`] — static provider specs and the client factory
//! - [`fallback::FallbackClient`] — primary provider plus ordered fallback chain
//! - [`classify`], [`retry`] — failure classification and the backoff loop

pub mod bedrock;
pub mod cborg;
pub mod classify;
pub mod client;
pub mod dedup;
pub mod error;
pub mod fallback;
pub mod genai;
pub mod http;
pub mod parse;
pub mod prompt;
pub mod registry;
pub mod retry;
pub mod stats;
pub mod traits;

// Re-export main types for convenience
pub use bedrock::BedrockClient;
pub use cborg::CborgClient;
pub use classify::{classify, ErrorKind};
pub use error::{BackendError, ProviderError};
pub use fallback::{FallbackClient, FallbackError};
pub use genai::GenAiClient;
pub use registry::{config_factory, create_client, ClientFactory, ProviderSpec, PROVIDERS};
pub use retry::RetryPolicy;
pub use stats::ApiStats;
pub use traits::ProviderClient;
