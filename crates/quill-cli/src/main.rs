//! Quill CLI — entry point.
//!
//! # Commands
//!
//! - `quill analyze FILE...` — extract entities from journal entries
//! - `quill test-connection` — probe the configured provider(s)
//! - `quill status` — show configuration and provider status
//! - `quill init` — write a starter config file

mod analyze;
mod helpers;
mod init;
mod status;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use quill_core::config::{self, CliOverrides, Config, ProviderSelection};
use quill_providers::fallback::FallbackClient;
use quill_providers::registry::config_factory;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// 🪶 Quill — journal entity extraction over interchangeable LLM providers
#[derive(Parser)]
#[command(name = "quill", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command. CLI values beat the config file, which
/// beats the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file (default: ~/.quill/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Primary provider: bedrock, google_genai or cborg
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Fallback providers, in order (comma separated)
    #[arg(long, global = true, value_delimiter = ',')]
    fallback: Option<Vec<String>>,

    /// Entry database path
    #[arg(long, global = true, value_name = "PATH")]
    db_path: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, default_value_t = false)]
    logs: bool,
}

impl GlobalArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            provider: self.provider.clone(),
            fallback_providers: self.fallback.clone(),
            db_path: self.db_path.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract projects, participants, tasks and themes from journal entries
    Analyze {
        /// Journal entry files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Entries analyzed concurrently
        #[arg(short, long, default_value_t = 4)]
        jobs: usize,

        /// Print results as JSON lines
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Treat unparseable model output as a provider failure
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Send a minimal request to the configured provider(s)
    TestConnection {
        /// Probe every provider in the chain, not just the primary
        #[arg(long, default_value_t = false)]
        all: bool,
    },

    /// Show configuration and provider status
    Status,

    /// Write a starter config file
    Init {
        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.logs);

    match cli.command {
        Commands::Analyze {
            files,
            jobs,
            json,
            strict,
        } => {
            let ctx = AppContext::load(&cli.global)?;
            analyze::run(&ctx, files, jobs, json, strict).await
        }
        Commands::TestConnection { all } => {
            let ctx = AppContext::load(&cli.global)?;
            analyze::test_connection(&ctx, all).await
        }
        Commands::Status => status::run(&cli.global),
        Commands::Init { force } => init::run(cli.global.config.as_deref(), force),
    }
}

// ─────────────────────────────────────────────
// Shared startup
// ─────────────────────────────────────────────

/// Loaded config plus the resolved provider selection.
pub struct AppContext {
    pub config: Config,
    pub selection: ProviderSelection,
    pub cancel: CancellationToken,
}

impl AppContext {
    /// Load and validate configuration. Any `ConfigError` is fatal here.
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let config =
            config::load_config(global.config.as_deref()).context("failed to load config")?;
        let selection = config::resolve_llm(&global.overrides(), &config.llm)
            .context("invalid provider selection")?;
        debug!(primary = %selection.primary, chain = ?selection.fallback_chain, "Starting");

        Ok(Self {
            config,
            selection,
            cancel: CancellationToken::new(),
        })
    }

    /// Orchestrator over the resolved chain; switches are printed as warnings.
    ///
    /// With `strict`, a degraded (unparseable) result also triggers fallback.
    pub fn fallback_client(&self, strict: bool) -> Arc<FallbackClient> {
        let factory = config_factory(self.config.llm.clone(), self.cancel.clone());
        let client = FallbackClient::new(&self.selection, factory)
            .with_notify(helpers::print_fallback_warning);
        if strict {
            Arc::new(client.with_acceptance(|result| !result.is_degraded()))
        } else {
            Arc::new(client)
        }
    }

    /// Cancel in-flight work on Ctrl-C.
    pub fn cancel_on_ctrl_c(&self) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                helpers::print_interrupted();
                cancel.cancel();
            }
        });
    }
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("quill=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "quill",
            "analyze",
            "a.md",
            "--provider",
            "cborg",
            "--fallback",
            "bedrock,google_genai",
            "--jobs",
            "2",
        ])
        .unwrap();

        let overrides = cli.global.overrides();
        assert_eq!(overrides.provider.as_deref(), Some("cborg"));
        assert_eq!(
            overrides.fallback_providers,
            Some(vec!["bedrock".to_string(), "google_genai".to_string()])
        );
        match cli.command {
            Commands::Analyze { files, jobs, .. } => {
                assert_eq!(files, vec![PathBuf::from("a.md")]);
                assert_eq!(jobs, 2);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_analyze_requires_files() {
        assert!(Cli::try_parse_from(["quill", "analyze"]).is_err());
    }

    #[test]
    fn test_context_rejects_fallback_equal_to_primary() {
        let dir = tempfile::tempdir().unwrap();
        let global = GlobalArgs {
            config: Some(dir.path().join("missing.json")),
            provider: Some("bedrock".into()),
            fallback: Some(vec!["bedrock".into()]),
            ..Default::default()
        };
        let err = AppContext::load(&global).err().unwrap();
        assert!(format!("{err:#}").contains("bedrock"));
    }

    #[test]
    fn test_context_rejects_unknown_provider() {
        let dir = tempfile::tempdir().unwrap();
        let global = GlobalArgs {
            config: Some(dir.path().join("missing.json")),
            provider: Some("not_a_provider".into()),
            ..Default::default()
        };
        assert!(AppContext::load(&global).is_err());
    }
}
