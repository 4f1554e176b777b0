//! Configuration Store
//!
//! Loads and saves the TOML config file and applies environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{Result, SheetAiError};
use crate::llm::{LlmConfig, LlmProvider};

/// Environment variable holding the model API key
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable holding the target spreadsheet id
pub const ENV_SPREADSHEET_ID: &str = "SPREADSHEET_ID";
/// Environment variable holding a ready-made Sheets bearer token
pub const ENV_SHEETS_TOKEN: &str = "SHEETS_ACCESS_TOKEN";

/// Fixed instruction for the follow-up summary call
pub const DEFAULT_SUMMARY_INSTRUCTIONS: &str = "You are a helpful assistant. Answer the user's question based on the data. Be concise and short. If you don't know the answer, say you don't know. Only use the provided data to answer. DO NOT ask any follow up questions.";

/// Unified sheetai configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Language model settings
    #[serde(default)]
    pub llm: LlmSettings,

    /// Spreadsheet backend settings
    #[serde(default)]
    pub sheets: SheetsSettings,

    /// Session loop settings
    #[serde(default)]
    pub agent: AgentSettings,
}

/// Language model endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// `openai` (Responses API) or `compatible` (chat completions)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Falls back to `OPENAI_API_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_llm_base_url(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// Spreadsheet backend endpoint and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,
    #[serde(default = "default_sheets_base_url")]
    pub base_url: String,
    /// OAuth client secrets for the installed-app flow
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    /// Cached authorized-user token
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
    /// Static bearer token; skips the OAuth flow entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            base_url: default_sheets_base_url(),
            credentials_path: default_credentials_path(),
            token_path: default_token_path(),
            access_token: None,
        }
    }
}

/// Session loop behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// System instructions for the command translator
    #[serde(default = "default_instructions_path")]
    pub instructions_path: PathBuf,
    /// Append-only interaction log (JSON array)
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    /// Conversation turns kept between requests
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Pause between commands of one batch
    #[serde(default = "default_command_delay_ms")]
    pub command_delay_ms: u64,
    #[serde(default = "default_summary_instructions")]
    pub summary_instructions: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            instructions_path: default_instructions_path(),
            log_file: default_log_file(),
            max_history: default_max_history(),
            command_delay_ms: default_command_delay_ms(),
            summary_instructions: default_summary_instructions(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| SheetAiError::InvalidConfig {
            message: e.to_string(),
        })
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| SheetAiError::InvalidConfig {
            message: e.to_string(),
        })?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from the default location, or defaults when absent or unreadable
    pub fn load_or_default() -> Self {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return config,
                    Err(e) => warn!("Ignoring unreadable config {}: {}", path.display(), e),
                }
            }
        }
        Self::default()
    }

    /// Get default config file path
    pub fn default_path() -> Option<PathBuf> {
        super::get_config_dir().map(|d| d.join("config.toml"))
    }

    /// Apply environment overrides on top of file values
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Same as [`Config::apply_env`] with an injectable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ENV_API_KEY) {
            self.llm.api_key = Some(key);
        }
        if let Some(id) = non_empty(ENV_SPREADSHEET_ID) {
            self.sheets.spreadsheet_id = Some(id);
        }
        if let Some(token) = non_empty(ENV_SHEETS_TOKEN) {
            self.sheets.access_token = Some(token);
        }
    }

    /// Check that everything a session needs is present
    pub fn validate(&self) -> Result<()> {
        self.spreadsheet_id()?;
        self.llm_provider()?;
        if self.agent.max_history == 0 {
            return Err(SheetAiError::InvalidConfig {
                message: "agent.max_history must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Spreadsheet id, required
    pub fn spreadsheet_id(&self) -> Result<&str> {
        self.sheets
            .spreadsheet_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| SheetAiError::MissingConfig {
                key: "sheets.spreadsheet_id".to_string(),
            })
    }

    fn llm_provider(&self) -> Result<LlmProvider> {
        self.llm
            .provider
            .parse()
            .map_err(|message| SheetAiError::InvalidConfig { message })
    }

    /// Build the LLM client configuration
    pub fn llm_config(&self) -> Result<LlmConfig> {
        Ok(LlmConfig::new(
            self.llm_provider()?,
            self.llm.base_url.clone(),
            self.llm.model.clone(),
            self.llm.api_key.clone(),
        )
        .with_timeout_secs(self.llm.timeout_secs))
    }

    /// Inter-command pause for the batch runner
    pub fn command_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.agent.command_delay_ms)
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-5-mini".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.json")
}

fn default_token_path() -> PathBuf {
    PathBuf::from("token.json")
}

fn default_instructions_path() -> PathBuf {
    PathBuf::from("instructions.txt")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("agent_log.json")
}

fn default_max_history() -> usize {
    10
}

fn default_command_delay_ms() -> u64 {
    1000
}

fn default_summary_instructions() -> String {
    DEFAULT_SUMMARY_INSTRUCTIONS.to_string()
}
