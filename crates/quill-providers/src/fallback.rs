//! Fallback orchestrator — primary provider plus an ordered fallback chain.
//!
//! [`FallbackClient`] walks `primary → fallback₁ → … → exhausted`, moving
//! forward only when the active provider fails a call. The switch is sticky:
//! once a provider has failed, later calls start at its successor. Exhaustion
//! ends the call that hit it; the next call tries the last chain entry again.
//! Clients are built lazily through a [`ClientFactory`], so a provider whose
//! credentials are missing simply counts as failing when it is reached.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{error, info, warn};

use quill_core::config::ProviderSelection;
use quill_core::types::{AnalysisResult, ProviderKind};

use crate::classify::ErrorKind;
use crate::error::ProviderError;
use crate::registry::ClientFactory;
use crate::stats::ApiStats;
use crate::traits::ProviderClient;

/// Receives one human-readable message per provider switch.
pub type FallbackNotify = Box<dyn Fn(&str) + Send + Sync>;

/// Decides whether an `Ok` result counts as success.
pub type AcceptResult = Box<dyn Fn(&AnalysisResult) -> bool + Send + Sync>;

/// The orchestrator gave up on a call.
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error(
        "all providers failed (tried: {}); last error [{kind}]: {message}",
        tried.join(", ")
    )]
    Exhausted {
        /// Providers attempted by this call, in order.
        tried: Vec<String>,
        kind: ErrorKind,
        message: String,
    },

    #[error("analysis cancelled")]
    Cancelled,
}

impl FallbackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FallbackError::Exhausted { kind, .. } => *kind,
            FallbackError::Cancelled => ErrorKind::Unknown,
        }
    }
}

/// Why one provider's attempt at a call did not count as success.
#[derive(Clone, Debug)]
struct Failure {
    kind: ErrorKind,
    message: String,
}

impl From<&ProviderError> for Failure {
    fn from(err: &ProviderError) -> Self {
        Failure {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Default)]
struct ChainState {
    /// Index into `order`; never moves past the last entry.
    active: usize,
    /// The last call failed on the last entry. Cleared by the next success.
    exhausted: bool,
    /// Lazily built clients, one slot per entry of `order`.
    clients: Vec<Option<Arc<dyn ProviderClient>>>,
}

/// Routes calls to the active provider and falls back on failure.
pub struct FallbackClient {
    order: Vec<ProviderKind>,
    factory: ClientFactory,
    state: Mutex<ChainState>,
    notify: Option<FallbackNotify>,
    accept: AcceptResult,
}

impl std::fmt::Debug for FallbackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackClient")
            .field("order", &self.order)
            .field("active", &self.active_provider_name())
            .finish()
    }
}

impl FallbackClient {
    /// `selection` must already be validated (see `quill_core::config::resolve_llm`).
    pub fn new(selection: &ProviderSelection, factory: ClientFactory) -> Self {
        let order: Vec<ProviderKind> = selection.ordered().collect();
        let state = ChainState {
            active: 0,
            exhausted: false,
            clients: vec![None; order.len()],
        };
        Self {
            order,
            factory,
            state: Mutex::new(state),
            notify: None,
            accept: Box::new(|_| true),
        }
    }

    /// Call `notify` once for every provider switch.
    pub fn with_notify(mut self, notify: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.notify = Some(Box::new(notify));
        self
    }

    /// Treat `Ok` results rejected by `accept` as provider failures.
    pub fn with_acceptance(
        mut self,
        accept: impl Fn(&AnalysisResult) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.accept = Box::new(accept);
        self
    }

    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Name of the provider currently serving calls, `None` while exhausted.
    pub fn active_provider_name(&self) -> Option<&'static str> {
        let state = self.lock();
        if state.exhausted {
            return None;
        }
        self.order.get(state.active).map(|k| k.as_str())
    }

    /// Whether the most recent failing call ran out of providers.
    pub fn is_exhausted(&self) -> bool {
        self.lock().exhausted
    }

    /// Active index plus its client, building the client if needed.
    fn current(&self) -> Option<(usize, Result<Arc<dyn ProviderClient>, ProviderError>)> {
        let mut state = self.lock();
        let index = state.active;
        let kind = *self.order.get(index)?;
        if let Some(client) = &state.clients[index] {
            return Some((index, Ok(Arc::clone(client))));
        }
        let built = (self.factory)(kind);
        if let Ok(client) = &built {
            state.clients[index] = Some(Arc::clone(client));
        }
        Some((index, built))
    }

    /// Leave state `from` after `failure`. Only the first caller to observe a
    /// failure of a given state moves the chain and fires the callback.
    /// Returns `false` when `from` was the last entry, ending the call.
    fn advance(&self, from: usize, failure: &Failure) -> bool {
        let next = {
            let mut state = self.lock();
            if state.active != from {
                return true;
            }
            match self.order.get(from + 1).copied() {
                Some(next) => {
                    state.active = from + 1;
                    next
                }
                None => {
                    state.exhausted = true;
                    drop(state);
                    error!(
                        failed = %self.order[from],
                        kind = %failure.kind,
                        error = %failure.message,
                        "Fallback chain exhausted"
                    );
                    return false;
                }
            }
        };

        let failed = self.order[from];
        let message = format!(
            "Provider {failed} failed: {}. Falling back to {next}.",
            failure.message
        );
        warn!(failed = %failed, next = %next, kind = %failure.kind, "{message}");
        if let Some(notify) = &self.notify {
            notify(&message);
        }
        true
    }

    fn mark_served(&self) {
        self.lock().exhausted = false;
    }

    /// Analyze one entry, switching providers on failure.
    pub async fn analyze(
        &self,
        source: &str,
        content: &str,
    ) -> Result<AnalysisResult, FallbackError> {
        let mut tried = Vec::new();

        loop {
            let Some((index, client)) = self.current() else {
                return Err(FallbackError::Exhausted {
                    tried,
                    kind: ErrorKind::Unknown,
                    message: "no providers configured".to_string(),
                });
            };
            let kind = self.order[index];
            tried.push(kind.as_str().to_string());

            let failure = match client {
                Err(e) => Failure::from(&e),
                Ok(client) => match client.try_analyze(source, content).await {
                    Ok(result) if (self.accept)(&result) => {
                        self.mark_served();
                        if index > 0 {
                            info!(provider = %kind, source, "Served by fallback provider");
                        }
                        return Ok(result);
                    }
                    Ok(result) => Failure {
                        kind: ErrorKind::Unknown,
                        message: format!(
                            "result rejected ({})",
                            result.raw_response.as_deref().unwrap_or("no diagnostic")
                        ),
                    },
                    Err(ProviderError::Cancelled { .. }) => return Err(FallbackError::Cancelled),
                    Err(e) => Failure::from(&e),
                },
            };

            if !self.advance(index, &failure) {
                return Err(FallbackError::Exhausted {
                    tried,
                    kind: failure.kind,
                    message: failure.message,
                });
            }
        }
    }

    /// Stats of the active client; zeroed if it cannot be built.
    pub fn stats(&self) -> ApiStats {
        match self.current() {
            Some((_, Ok(client))) => client.stats(),
            _ => ApiStats::default(),
        }
    }

    /// Stats of every client built so far, in chain order.
    pub fn all_stats(&self) -> Vec<(&'static str, ApiStats)> {
        let state = self.lock();
        self.order
            .iter()
            .zip(&state.clients)
            .filter_map(|(kind, client)| client.as_ref().map(|c| (kind.as_str(), c.stats())))
            .collect()
    }

    /// Static info of the active client.
    pub fn provider_info(&self) -> BTreeMap<String, String> {
        match self.current() {
            Some((_, Ok(client))) => client.provider_info(),
            Some((index, Err(e))) => BTreeMap::from([
                ("provider".to_string(), self.order[index].to_string()),
                ("error".to_string(), e.to_string()),
            ]),
            None => BTreeMap::from([("status".to_string(), "no providers".to_string())]),
        }
    }

    /// Connection probe against the active client. Does not switch providers.
    pub async fn test_connection(&self) -> bool {
        match self.current() {
            Some((_, Ok(client))) => client.test_connection().await,
            Some((index, Err(e))) => {
                warn!(provider = %self.order[index], error = %e, "Provider unavailable");
                false
            }
            None => false,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
