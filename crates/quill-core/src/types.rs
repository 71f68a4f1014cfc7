//! Core types for Quill — the analysis result and the recognized provider set.
//!
//! These are shared by the provider layer (which produces results) and the
//! config layer (which validates provider names).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Provider kinds
// ─────────────────────────────────────────────

/// The LLM backends Quill knows how to talk to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Amazon Bedrock (Converse API).
    Bedrock,
    /// Google Generative AI (Gemini).
    GoogleGenai,
    /// CBORG, an OpenAI-compatible gateway.
    Cborg,
}

impl ProviderKind {
    /// Every recognized provider, in display order.
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Bedrock,
        ProviderKind::GoogleGenai,
        ProviderKind::Cborg,
    ];

    /// Config/CLI name of the provider (e.g. `"google_genai"`).
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Bedrock => "bedrock",
            ProviderKind::GoogleGenai => "google_genai",
            ProviderKind::Cborg => "cborg",
        }
    }

    /// Comma-separated list of recognized names, for error messages.
    pub fn known_names() -> String {
        Self::ALL
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a recognized provider.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider '{0}'")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bedrock" => Ok(ProviderKind::Bedrock),
            "google_genai" => Ok(ProviderKind::GoogleGenai),
            "cborg" => Ok(ProviderKind::Cborg),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

// ─────────────────────────────────────────────
// Entities
// ─────────────────────────────────────────────

/// The four entity lists extracted from one journal entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySet {
    pub projects: Vec<String>,
    pub participants: Vec<String>,
    pub tasks: Vec<String>,
    pub themes: Vec<String>,
}

impl EntitySet {
    /// True when no entity of any kind was found.
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
            && self.participants.is_empty()
            && self.tasks.is_empty()
            && self.themes.is_empty()
    }

    /// Total number of entities across all four lists.
    pub fn len(&self) -> usize {
        self.projects.len() + self.participants.len() + self.tasks.len() + self.themes.len()
    }
}

// ─────────────────────────────────────────────
// AnalysisResult
// ─────────────────────────────────────────────

/// Prefix put in front of `raw_response` when an analysis degraded.
pub const DIAGNOSTIC_PREFIX: &str = "Error: ";

/// Outcome of analyzing one journal entry.
///
/// Built once by the provider client and handed to the caller as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Where the entry came from (usually a file path).
    pub source: String,
    #[serde(flatten)]
    pub entities: EntitySet,
    /// Wall time of the whole call, retries included.
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Raw model text, or a diagnostic starting with [`DIAGNOSTIC_PREFIX`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    /// Registry name of the provider that produced this result.
    pub provider: String,
    /// Set only by [`AnalysisResult::degraded`].
    #[serde(default)]
    pub degraded: bool,
}

impl AnalysisResult {
    /// A successful result.
    pub fn new(
        source: impl Into<String>,
        provider: impl Into<String>,
        entities: EntitySet,
        duration: Duration,
    ) -> Self {
        Self {
            source: source.into(),
            entities,
            duration,
            confidence: None,
            raw_response: None,
            provider: provider.into(),
            degraded: false,
        }
    }

    /// An empty result carrying a diagnostic message.
    pub fn degraded(
        source: impl Into<String>,
        provider: impl Into<String>,
        duration: Duration,
        diagnostic: impl fmt::Display,
    ) -> Self {
        Self {
            source: source.into(),
            entities: EntitySet::default(),
            duration,
            confidence: None,
            raw_response: Some(format!("{DIAGNOSTIC_PREFIX}{diagnostic}")),
            provider: provider.into(),
            degraded: true,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_raw_response(mut self, raw: impl Into<String>) -> Self {
        self.raw_response = Some(raw.into());
        self
    }

    /// Whether this result is the degraded (diagnostic) form.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
