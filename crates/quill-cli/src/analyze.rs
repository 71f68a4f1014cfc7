//! `quill analyze` and `quill test-connection`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

use quill_core::types::AnalysisResult;
use quill_providers::fallback::{FallbackClient, FallbackError};
use quill_providers::registry::{create_client, spec_for};

use crate::helpers;
use crate::AppContext;

/// Outcome of one file in a batch.
enum EntryOutcome {
    Analyzed(AnalysisResult),
    Unreadable(PathBuf, anyhow::Error),
    Failed(PathBuf, FallbackError),
}

/// Analyze `files` concurrently (at most `jobs` in flight) through the
/// fallback chain and print each result as it completes.
pub async fn run(
    ctx: &AppContext,
    files: Vec<PathBuf>,
    jobs: usize,
    json: bool,
    strict: bool,
) -> Result<()> {
    ctx.cancel_on_ctrl_c();
    let client = ctx.fallback_client(strict);
    let permits = Arc::new(Semaphore::new(jobs.max(1)));
    let total = files.len();

    let mut tasks = JoinSet::new();
    for path in files {
        let client = Arc::clone(&client);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return EntryOutcome::Unreadable(path, anyhow::anyhow!("scheduler closed"));
            };
            analyze_file(&client, path).await
        });
    }

    let mut failures = 0usize;
    let mut last_error: Option<FallbackError> = None;
    while let Some(joined) = tasks.join_next().await {
        match joined.context("analysis task panicked")? {
            EntryOutcome::Analyzed(result) => {
                if json {
                    println!("{}", helpers::result_json_line(&result)?);
                } else {
                    helpers::print_result(&result);
                }
            }
            EntryOutcome::Unreadable(path, e) => {
                failures += 1;
                eprintln!("{} {}: {e:#}", "✗".red(), path.display());
            }
            EntryOutcome::Failed(path, e) => {
                failures += 1;
                eprintln!("{} {}: {e}", "✗".red(), path.display());
                last_error = Some(e);
            }
        }
    }

    if !json {
        print_summary(&client, total, failures);
    }

    if let Some(FallbackError::Cancelled) = last_error {
        bail!("analysis cancelled");
    }
    if let Some(FallbackError::Exhausted { kind, message, .. }) = last_error {
        bail!("all providers failed; last error [{kind}]: {message}");
    }
    if failures > 0 {
        bail!("{failures} of {total} entries could not be analyzed");
    }
    Ok(())
}

async fn analyze_file(client: &FallbackClient, path: PathBuf) -> EntryOutcome {
    let content = match read_entry(&path).await {
        Ok(content) => content,
        Err(e) => return EntryOutcome::Unreadable(path, e),
    };

    let source = path.display().to_string();
    debug!(source = %source, chars = content.chars().count(), "Analyzing file");
    match client.analyze(&source, &content).await {
        Ok(result) => EntryOutcome::Analyzed(result),
        Err(e) => {
            error!(source = %source, error = %e, "Analysis failed");
            EntryOutcome::Failed(path, e)
        }
    }
}

async fn read_entry(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

fn print_summary(client: &FallbackClient, total: usize, failures: usize) {
    println!();
    println!(
        "{} {} analyzed, {} failed",
        "Done:".bold(),
        total - failures,
        failures
    );
    if let Some(active) = client.active_provider_name() {
        println!("  {:<14} {}", "Active:".bold(), active);
    }
    for (name, stats) in client.all_stats() {
        helpers::print_stats(name, &stats);
    }
}

/// Probe the active provider, or every provider in the chain with `all`.
pub async fn test_connection(ctx: &AppContext, all: bool) -> Result<()> {
    ctx.cancel_on_ctrl_c();
    println!();

    if !all {
        let client = ctx.fallback_client(false);
        let name = client.active_provider_name().unwrap_or("?");
        let ok = client.test_connection().await;
        println!("  {:<22} {}", spec_for(ctx.selection.primary).display_name, helpers::check_mark(ok));
        println!();
        if !ok {
            bail!("connection test failed for {name}");
        }
        return Ok(());
    }

    let mut failed = Vec::new();
    for kind in ctx.selection.ordered() {
        let display = spec_for(kind).display_name;
        let ok = match create_client(kind, &ctx.config.llm, &ctx.cancel) {
            Ok(client) => client.test_connection().await,
            Err(e) => {
                println!("  {:<22} {} {}", display, helpers::check_mark(false), e.to_string().dimmed());
                failed.push(kind.as_str());
                continue;
            }
        };
        println!("  {:<22} {}", display, helpers::check_mark(ok));
        if !ok {
            failed.push(kind.as_str());
        }
    }
    println!();

    if !failed.is_empty() {
        bail!("connection test failed for {}", failed.join(", "));
    }
    Ok(())
}
