//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `analyze` - Run the full analysis pipeline on a local file
//! - `prompts` - Prompt library inspection
//! - `serve` - Web server command

pub mod analyze;
pub mod prompts;
pub mod serve;

// Re-export command functions for main.rs
pub use analyze::*;
pub use prompts::*;
pub use serve::*;

use std::path::Path;

use anyhow::{Context, Result};
use medibill_core::AppConfig;

/// Load configuration from `path` (or the default location) plus environment
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    AppConfig::load(path).with_context(|| match path {
        Some(p) => format!("Failed to load config from {}", p.display()),
        None => "Failed to load config".to_string(),
    })
}
