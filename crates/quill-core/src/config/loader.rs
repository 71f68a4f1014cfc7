//! Config loader — reads `~/.quill/config.json` and writes the starter file.
//!
//! Unlike CLI flags and environment variables, which are layered by
//! [`super::resolve`], the file itself is loaded whole: a missing file means
//! defaults, a malformed one is a startup error.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::schema::Config;
use crate::error::ConfigError;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from `path`, or from the default location.
///
/// Returns `Config::default()` if the file doesn't exist.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    load_config_from_path(&config_path)
}

fn load_config_from_path(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if content.trim().is_empty() {
        return Ok(Config::default());
    }

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_missing_file() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.json")).unwrap();
        assert!(config.llm.provider.is_none());
        assert_eq!(config.llm.bedrock.call.max_retries, 3);
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "llm": {
                "provider": "cborg",
                "cborg": { "model": "lbl/llama", "timeout": 30 }
            }
        }"#,
        );

        let config = load_config_from_path(file.path()).unwrap();
        assert_eq!(config.llm.provider.as_deref(), Some("cborg"));
        assert_eq!(config.llm.cborg.model, "lbl/llama");
        assert_eq!(config.llm.cborg.call.timeout, 30);
        // Default preserved
        assert_eq!(config.llm.cborg.endpoint, "https://api.cborg.lbl.gov");
    }

    #[test]
    fn test_load_invalid_json_is_error() {
        let file = write_temp_json("not valid json {{{");
        let err = load_config_from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_empty_file() {
        let file = write_temp_json("   ");
        let config = load_config_from_path(file.path()).unwrap();
        assert!(config.llm.provider.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.llm.provider = Some("google_genai".to_string());
        config.llm.fallback_providers = Some(vec!["bedrock".to_string()]);
        config.database.path = Some("~/journal.db".to_string());

        save_config(&config, Some(&path)).unwrap();

        let reloaded = load_config(Some(&path)).unwrap();
        assert_eq!(reloaded.llm.provider.as_deref(), Some("google_genai"));
        assert_eq!(
            reloaded.llm.fallback_providers,
            Some(vec!["bedrock".to_string()])
        );
        assert_eq!(reloaded.database.path.as_deref(), Some("~/journal.db"));
    }

    #[test]
    fn test_saved_json_uses_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        save_config(&Config::default(), Some(&path)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert!(raw["llm"]["cborg"].get("apiKeyEnv").is_some());
        assert!(raw["llm"]["cborg"].get("api_key_env").is_none());
    }
}
