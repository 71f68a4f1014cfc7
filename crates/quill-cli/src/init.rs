//! `quill init` — write a starter config file.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use quill_core::config::{get_config_path, save_config, Config};

/// Run the init command.
pub fn run(path: Option<&Path>, force: bool) -> Result<()> {
    println!();
    println!("{}", "🪶 Quill — Setup".cyan().bold());
    println!();

    let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    if write_starter_config(&config_path, force)? {
        println!("  {} created config at {}", "✓".green(), config_path.display());
    } else {
        println!(
            "  {} config already exists at {} (use --force to overwrite)",
            "✓".green(),
            config_path.display()
        );
    }

    println!();
    println!(
        "{}",
        "Next: export the API key for your provider (e.g. AWS_BEARER_TOKEN_BEDROCK), \
         then run `quill test-connection`."
            .dimmed()
    );
    println!();
    Ok(())
}

/// Write a default config unless one exists. Returns whether a file was written.
fn write_starter_config(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    save_config(&Config::default(), Some(path))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}
