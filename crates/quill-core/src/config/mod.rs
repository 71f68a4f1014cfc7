//! Configuration system — schema, file loading, and layered resolution.
//!
//! # Usage
//! ```no_run
//! use quill_core::config::{self, CliOverrides};
//!
//! let cfg = config::load_config(None).expect("config");
//! let selection = config::resolve_llm(&CliOverrides::default(), &cfg.llm).expect("providers");
//! println!("Primary provider: {}", selection.primary);
//! ```

pub mod loader;
pub mod resolve;
pub mod schema;

// Re-export key types
pub use loader::{get_config_path, load_config, save_config};
pub use resolve::{
    resolve_db_path, resolve_llm, resolve_setting, validate_selection, CliOverrides,
    ProviderSelection,
};
pub use schema::{BedrockConfig, CallSettings, CborgConfig, Config, GenAiConfig, LlmConfig};
