//! Configuration errors. All of them are fatal at startup.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown provider '{name}' in {field} (expected one of: {known})")]
    UnknownProvider {
        field: &'static str,
        name: String,
        known: String,
    },

    #[error("fallback provider '{0}' is the same as the primary provider")]
    FallbackIsPrimary(String),

    #[error("fallback provider '{0}' is listed more than once")]
    DuplicateFallback(String),
}
