//! Configuration management
//!
//! TOML config store, environment overrides and the instructions loader.

pub mod prompt;
pub mod store;

pub use prompt::{load_instructions, DEFAULT_INSTRUCTIONS};
pub use store::{AgentSettings, Config, LlmSettings, SheetsSettings, DEFAULT_SUMMARY_INSTRUCTIONS};

use std::path::PathBuf;

/// Get the configuration directory path
pub fn get_config_dir() -> Option<PathBuf> {
    use dirs::config_dir;
    use home::home_dir;

    if let Some(dir) = config_dir() {
        return Some(dir.join("sheetai"));
    }

    if let Some(home) = home_dir() {
        return Some(home.join(".config").join("sheetai"));
    }

    None
}
