//! `quill status` — show configuration and provider status.

use anyhow::{Context, Result};
use colored::Colorize;

use quill_core::config::{self, get_config_path, Config, ProviderSelection};
use quill_core::types::ProviderKind;
use quill_providers::registry::{api_key_env, PROVIDERS};

use crate::GlobalArgs;

/// Run the status command.
pub fn run(global: &GlobalArgs) -> Result<()> {
    let config_path = global.config.clone().unwrap_or_else(get_config_path);
    let config = config::load_config(Some(&config_path)).context("failed to load config")?;
    let overrides = global.overrides();

    println!();
    println!("{}", "🪶 Quill Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found, using defaults)".dimmed().to_string()
        }
    );

    let db = config::resolve_db_path(&overrides, &config);
    println!(
        "  {:<18} {}",
        "Database:".bold(),
        match db {
            Some(path) => path.display().to_string(),
            None => "· not configured".dimmed().to_string(),
        }
    );

    // An invalid selection is reported, not fatal, so the rest still prints.
    match config::resolve_llm(&overrides, &config.llm) {
        Ok(selection) => print_selection(&selection),
        Err(e) => println!("  {:<18} {}", "Providers:".bold(), e.to_string().red()),
    }

    print_providers(&config);
    println!();
    Ok(())
}

fn print_selection(selection: &ProviderSelection) {
    println!("  {:<18} {}", "Primary:".bold(), selection.primary);
    let chain = if selection.fallback_chain.is_empty() {
        "· none".dimmed().to_string()
    } else {
        selection
            .fallback_chain
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(" → ")
    };
    println!("  {:<18} {}", "Fallback:".bold(), chain);
}

fn print_providers(config: &Config) {
    let llm = &config.llm;
    println!();
    println!("  {}", "Providers:".bold());

    for spec in PROVIDERS {
        let env = api_key_env(spec.kind, llm);
        let status = if std::env::var(env).is_ok_and(|v| !v.trim().is_empty()) {
            format!("{} ({env} set)", "✓".green())
        } else {
            format!("{}", format!("· {env} not set").dimmed())
        };
        println!("    {:<22} {}", spec.display_name, status);

        let detail = match spec.kind {
            ProviderKind::Bedrock => {
                format!("{} @ {}", llm.bedrock.model_id, llm.bedrock.region)
            }
            ProviderKind::GoogleGenai => format!(
                "{} @ {}{}",
                llm.google_genai.model,
                llm.google_genai.location,
                llm.google_genai
                    .project
                    .as_deref()
                    .map(|p| format!(" (project {p})"))
                    .unwrap_or_default()
            ),
            ProviderKind::Cborg => {
                format!("{} @ {}", llm.cborg.model, llm.cborg.endpoint)
            }
        };
        println!(
            "    {:<22} {}",
            "",
            format!("{detail} via {}", spec.api).dimmed()
        );
    }
}
