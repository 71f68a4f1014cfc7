//! Setting resolution — layers CLI flags, the config file, environment
//! variables and built-in defaults, then validates the provider selection.
//!
//! # Precedence (highest first)
//! 1. Explicit CLI value
//! 2. Config file value
//! 3. Environment variable
//! 4. Built-in default (may be absent)
//!
//! Empty strings count as "not set" at every layer.

use std::path::PathBuf;

use tracing::debug;

use super::schema::{Config, LlmConfig};
use crate::error::ConfigError;
use crate::types::ProviderKind;

/// Env var naming the primary provider.
pub const ENV_PROVIDER: &str = "QUILL_LLM__PROVIDER";
/// Env var with a comma-separated fallback chain.
pub const ENV_FALLBACK_PROVIDERS: &str = "QUILL_LLM__FALLBACK_PROVIDERS";
/// Env var with the entry database path.
pub const ENV_DB_PATH: &str = "QUILL_DB_PATH";

/// Provider used when nothing else names one.
pub const DEFAULT_PROVIDER: ProviderKind = ProviderKind::Bedrock;

/// Values given explicitly on the command line.
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub provider: Option<String>,
    pub fallback_providers: Option<Vec<String>>,
    pub db_path: Option<String>,
}

/// A validated primary provider plus its fallback chain.
///
/// The chain never contains the primary and never repeats a provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderSelection {
    pub primary: ProviderKind,
    pub fallback_chain: Vec<ProviderKind>,
}

impl ProviderSelection {
    /// Primary first, then the chain in order.
    pub fn ordered(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        std::iter::once(self.primary).chain(self.fallback_chain.iter().copied())
    }
}

/// Pick the first non-empty value in precedence order.
pub fn resolve_setting_with(
    cli: Option<&str>,
    file: Option<&str>,
    env_value: Option<String>,
    default: Option<&str>,
) -> Option<String> {
    fn present(v: Option<&str>) -> Option<&str> {
        v.filter(|s| !s.trim().is_empty())
    }

    present(cli)
        .or(present(file))
        .map(str::to_string)
        .or_else(|| env_value.filter(|s| !s.trim().is_empty()))
        .or_else(|| present(default).map(str::to_string))
}

/// [`resolve_setting_with`], reading `env_var` from the process environment.
pub fn resolve_setting(
    cli: Option<&str>,
    file: Option<&str>,
    env_var: &str,
    default: Option<&str>,
) -> Option<String> {
    resolve_setting_with(cli, file, std::env::var(env_var).ok(), default)
}

/// Resolve the entry database path. `None` means no database is configured.
pub fn resolve_db_path(cli: &CliOverrides, config: &Config) -> Option<PathBuf> {
    resolve_setting(
        cli.db_path.as_deref(),
        config.database.path.as_deref(),
        ENV_DB_PATH,
        None,
    )
    .map(|p| crate::utils::expand_home(&p))
}

pub fn resolve_db_path_with(
    cli: &CliOverrides,
    config: &Config,
    env: &dyn Fn(&str) -> Option<String>,
) -> Option<PathBuf> {
    resolve_setting_with(
        cli.db_path.as_deref(),
        config.database.path.as_deref(),
        env(ENV_DB_PATH),
        None,
    )
    .map(|p| crate::utils::expand_home(&p))
}

/// Resolve and validate the provider selection from all layers.
pub fn resolve_llm(cli: &CliOverrides, llm: &LlmConfig) -> Result<ProviderSelection, ConfigError> {
    resolve_llm_with(cli, llm, &env_lookup)
}

pub fn resolve_llm_with(
    cli: &CliOverrides,
    llm: &LlmConfig,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<ProviderSelection, ConfigError> {
    let primary = resolve_setting_with(
        cli.provider.as_deref(),
        llm.provider.as_deref(),
        env(ENV_PROVIDER),
        Some(DEFAULT_PROVIDER.as_str()),
    )
    .unwrap_or_else(|| DEFAULT_PROVIDER.as_str().to_string());

    let fallbacks: Vec<String> = match (&cli.fallback_providers, &llm.fallback_providers) {
        (Some(list), _) => list.clone(),
        (None, Some(list)) => list.clone(),
        (None, None) => env(ENV_FALLBACK_PROVIDERS)
            .map(|raw| split_list(&raw))
            .unwrap_or_default(),
    };

    let selection = validate_selection(&primary, &fallbacks)?;
    debug!(
        primary = %selection.primary,
        fallbacks = ?selection.fallback_chain,
        "Resolved provider selection"
    );
    Ok(selection)
}

/// Validate a primary provider name and its fallback chain.
pub fn validate_selection(
    primary: &str,
    fallbacks: &[String],
) -> Result<ProviderSelection, ConfigError> {
    let primary = parse_provider(primary, "llm.provider")?;

    let mut chain: Vec<ProviderKind> = Vec::with_capacity(fallbacks.len());
    for name in fallbacks {
        let kind = parse_provider(name, "llm.fallbackProviders")?;
        if kind == primary {
            return Err(ConfigError::FallbackIsPrimary(kind.to_string()));
        }
        if chain.contains(&kind) {
            return Err(ConfigError::DuplicateFallback(kind.to_string()));
        }
        chain.push(kind);
    }

    Ok(ProviderSelection {
        primary,
        fallback_chain: chain,
    })
}

fn parse_provider(name: &str, field: &'static str) -> Result<ProviderKind, ConfigError> {
    name.parse().map_err(|_| ConfigError::UnknownProvider {
        field,
        name: name.to_string(),
        known: ProviderKind::known_names(),
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
