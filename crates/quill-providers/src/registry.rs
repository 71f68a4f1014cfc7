//! Provider registry — static specs for the supported backends and the
//! factory that turns a [`ProviderKind`] plus config into a live client.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use quill_core::config::LlmConfig;
use quill_core::types::ProviderKind;

use crate::bedrock::BedrockClient;
use crate::cborg::CborgClient;
use crate::error::ProviderError;
use crate::genai::GenAiClient;
use crate::traits::ProviderClient;

/// Static description of one backend.
#[derive(Clone, Debug)]
pub struct ProviderSpec {
    pub kind: ProviderKind,
    /// Human-readable name for logs and status output.
    pub display_name: &'static str,
    /// Default env var holding the API key (overridable per provider in config).
    pub env_key: &'static str,
    /// Wire protocol, for status output.
    pub api: &'static str,
}

/// Every supported provider, in display order.
pub static PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        kind: ProviderKind::Bedrock,
        display_name: "Amazon Bedrock",
        env_key: "AWS_BEARER_TOKEN_BEDROCK",
        api: "Converse",
    },
    ProviderSpec {
        kind: ProviderKind::GoogleGenai,
        display_name: "Google Generative AI",
        env_key: "GOOGLE_API_KEY",
        api: "generateContent",
    },
    ProviderSpec {
        kind: ProviderKind::Cborg,
        display_name: "CBORG",
        env_key: "CBORG_API_KEY",
        api: "OpenAI chat completions",
    },
];

/// Find a spec by registry name (`"bedrock"`, `"google_genai"`, `"cborg"`).
pub fn find_by_name(name: &str) -> Option<&'static ProviderSpec> {
    let kind: ProviderKind = name.parse().ok()?;
    Some(spec_for(kind))
}

pub fn spec_for(kind: ProviderKind) -> &'static ProviderSpec {
    match kind {
        ProviderKind::Bedrock => &PROVIDERS[0],
        ProviderKind::GoogleGenai => &PROVIDERS[1],
        ProviderKind::Cborg => &PROVIDERS[2],
    }
}

/// Env var this config reads the key for `kind` from.
pub fn api_key_env(kind: ProviderKind, llm: &LlmConfig) -> &str {
    match kind {
        ProviderKind::Bedrock => &llm.bedrock.api_key_env,
        ProviderKind::GoogleGenai => &llm.google_genai.api_key_env,
        ProviderKind::Cborg => &llm.cborg.api_key_env,
    }
}

/// Build a client for `kind` from its config block.
pub fn create_client(
    kind: ProviderKind,
    llm: &LlmConfig,
    cancel: &CancellationToken,
) -> Result<Arc<dyn ProviderClient>, ProviderError> {
    debug!(
        provider = spec_for(kind).display_name,
        key_env = api_key_env(kind, llm),
        "Creating LLM provider"
    );

    let client: Arc<dyn ProviderClient> = match kind {
        ProviderKind::Bedrock => {
            Arc::new(BedrockClient::new(&llm.bedrock)?.with_cancellation(cancel.clone()))
        }
        ProviderKind::GoogleGenai => {
            Arc::new(GenAiClient::new(&llm.google_genai)?.with_cancellation(cancel.clone()))
        }
        ProviderKind::Cborg => {
            Arc::new(CborgClient::new(&llm.cborg)?.with_cancellation(cancel.clone()))
        }
    };
    Ok(client)
}

/// Produces a client on demand. The fallback orchestrator calls this lazily,
/// so a provider is only constructed once it is actually needed.
pub type ClientFactory =
    Arc<dyn Fn(ProviderKind) -> Result<Arc<dyn ProviderClient>, ProviderError> + Send + Sync>;

/// [`ClientFactory`] backed by [`create_client`].
pub fn config_factory(llm: LlmConfig, cancel: CancellationToken) -> ClientFactory {
    Arc::new(move |kind: ProviderKind| create_client(kind, &llm, &cancel))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_a_spec() {
        assert_eq!(PROVIDERS.len(), ProviderKind::ALL.len());
        for kind in ProviderKind::ALL {
            assert_eq!(spec_for(kind).kind, kind);
        }
    }

    #[test]
    fn test_find_by_name() {
        assert_eq!(find_by_name("cborg").unwrap().display_name, "CBORG");
        assert_eq!(
            find_by_name(" Google_GenAI ").unwrap().kind,
            ProviderKind::GoogleGenai
        );
        assert!(find_by_name("openai").is_none());
    }

    #[test]
    fn test_default_env_keys_match_config() {
        let llm = LlmConfig::default();
        for spec in PROVIDERS {
            assert_eq!(api_key_env(spec.kind, &llm), spec.env_key);
        }
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let mut llm = LlmConfig::default();
        llm.cborg.api_key_env = "QUILL_TEST_UNSET_CBORG_KEY".into();
        let err = create_client(ProviderKind::Cborg, &llm, &CancellationToken::new()).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured { .. }));
        assert_eq!(err.provider(), "cborg");
    }

    #[test]
    fn test_config_factory_builds_client() {
        let mut llm = LlmConfig::default();
        // PATH is always set, which is all the constructor checks.
        llm.google_genai.api_key_env = "PATH".into();
        let factory = config_factory(llm, CancellationToken::new());
        let client = factory(ProviderKind::GoogleGenai).unwrap();
        assert_eq!(client.name(), "google_genai");
    }
}
