//! CLI argument parsing using clap 4.x derive macros

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sheetai_core::config::Config;

/// Talk to a Google spreadsheet in plain language
///
/// A language model turns each request into READ / WRITE / CREATESHEET /
/// LIST / CLEAR / DELETESHEET commands that run against one spreadsheet.
#[derive(Parser, Debug)]
#[command(name = "sheetai")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// The command to execute (interactive session when omitted)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Spreadsheet to operate on (overrides config and SPREADSHEET_ID)
    #[arg(short, long, global = true)]
    pub spreadsheet_id: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Interaction log file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// System instructions file
    #[arg(long, global = true)]
    pub instructions: Option<PathBuf>,

    /// Print version information
    #[arg(long)]
    pub version: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single request and exit
    Query {
        /// The request, in plain language
        #[arg(num_args = 1.., required = true)]
        request: Vec<String>,
    },

    /// Sign in to Google and cache the token
    Auth,

    /// Show the resolved configuration
    Config,
}

impl Cli {
    /// Apply flag overrides on top of file and environment values
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(id) = self.spreadsheet_id.as_deref().filter(|s| !s.trim().is_empty()) {
            config.sheets.spreadsheet_id = Some(id.trim().to_string());
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(path) = &self.log_file {
            config.agent.log_file = path.clone();
        }
        if let Some(path) = &self.instructions {
            config.agent.instructions_path = path.clone();
        }
    }
}
