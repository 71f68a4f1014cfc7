//! Core types and configuration for Quill.
//!
//! - [`types`] — `AnalysisResult`, `EntitySet`, `ProviderKind`
//! - [`config`] — config file schema, loader, and CLI/file/env resolution
//! - [`error`] — `ConfigError`

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use error::ConfigError;
pub use types::{AnalysisResult, EntitySet, ProviderKind};
