//! reqwest plumbing shared by the HTTP backends.

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::error;

use crate::error::{BackendError, ProviderError};

/// Build the connection-pooled client used by one provider.
///
/// Per-attempt deadlines are enforced by `AnalysisCore`, not here.
pub fn build_client(provider: &str) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .build()
        .map_err(|e| ProviderError::NotConfigured {
            provider: provider.to_string(),
            reason: format!("failed to build HTTP client: {e}"),
        })
}

/// Read the API key from the env var named `var`.
pub fn api_key_from_env(provider: &str, var: &str) -> Result<String, ProviderError> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(ProviderError::NotConfigured {
            provider: provider.to_string(),
            reason: format!("{var} is not set"),
        }),
    }
}

/// Send `request` and decode a JSON body, mapping any failure to [`BackendError`].
pub async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
) -> Result<T, BackendError> {
    let response = request.send().await.map_err(|e| {
        error!(provider, error = %e, "HTTP request failed");
        BackendError::from(e)
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        error!(provider, status = %status, body = %body, "API error");
        return Err(BackendError::http(status.as_u16(), &body));
    }

    response.json::<T>().await.map_err(|e| {
        error!(provider, error = %e, "Failed to decode response");
        BackendError::new(format!("malformed response body: {e}"))
    })
}

/// Join a base URL and a path without doubling slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_trailing_slash() {
        assert_eq!(
            join_url("https://api.cborg.lbl.gov/", "chat/completions"),
            "https://api.cborg.lbl.gov/chat/completions"
        );
        assert_eq!(
            join_url("https://api.cborg.lbl.gov", "/chat/completions"),
            "https://api.cborg.lbl.gov/chat/completions"
        );
    }

    #[test]
    fn test_missing_api_key() {
        let err = api_key_from_env("cborg", "QUILL_TEST_SURELY_UNSET_KEY").unwrap_err();
        assert!(err.to_string().contains("QUILL_TEST_SURELY_UNSET_KEY is not set"));
    }
}
