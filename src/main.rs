//! `sheetai` - talk to a Google spreadsheet in plain language
//!
//! Each request goes to a language model that answers with spreadsheet
//! commands; those run against the configured spreadsheet and every turn is
//! recorded in a JSON log.

use anyhow::{Context, Result};
use clap::Parser;
use console::Style;
use reqwest::Client as HttpClient;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use sheetai_core::config::{load_instructions, Config};
use sheetai_core::util::mask_secret;
use sheetai_core::{InteractionLog, LlmClient, Session, SessionSettings, SheetAiError, SheetsClient};

mod auth;
mod cli;
mod repl;

const DEFAULT_LOG_FILTER: &str = "sheetai=warn,sheetai_core=warn";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.version {
        let blue = Style::new().blue();
        println!(
            "{} v{} ({})",
            blue.apply_to("sheetai"),
            env!("CARGO_PKG_VERSION"),
            env!("GIT_HASH")
        );
        return Ok(());
    }

    let (config, config_path) = load_config(&cli)?;

    match &cli.command {
        Some(Commands::Config) => {
            print_config(&config, config_path.as_deref());
            Ok(())
        }
        Some(Commands::Auth) => {
            let http = HttpClient::new();
            auth::ensure_token_source(&config.sheets, &http).await?;
            let green = Style::new().green();
            println!("{}", green.apply_to("Spreadsheet access is set up."));
            Ok(())
        }
        Some(Commands::Query { request }) => {
            let mut session = build_session(&config).await?;
            let report = session.handle_turn(&request.join(" ")).await;
            match report.error {
                Some(error) => Err(anyhow::anyhow!(error)),
                None => Ok(()),
            }
        }
        None => {
            let mut session = build_session(&config).await?;
            repl::run(&mut session).await
        }
    }
}

/// File, then environment, then flags
fn load_config(cli: &Cli) -> Result<(Config, Option<PathBuf>)> {
    let (mut config, path) = match &cli.config {
        Some(path) => (
            Config::load(path).with_context(|| format!("Failed to load {}", path.display()))?,
            Some(path.clone()),
        ),
        None => (Config::load_or_default(), Config::default_path()),
    };
    config.apply_env();
    cli.apply_overrides(&mut config);
    Ok((config, path))
}

async fn build_session(config: &Config) -> Result<Session> {
    if let Err(e) = config.validate() {
        report_startup_error(&e);
        return Err(e).context("Configuration is incomplete");
    }

    let instructions = load_instructions(&config.agent.instructions_path)
        .context("Failed to read instructions")?;

    let model = LlmClient::new(config.llm_config()?).context("Failed to create model client")?;
    tracing::info!("Using model {}", model.model());

    let http = HttpClient::new();
    let tokens = auth::ensure_token_source(&config.sheets, &http).await?;
    let backend = SheetsClient::new(&config.sheets.base_url, config.spreadsheet_id()?, tokens)
        .context("Failed to create spreadsheet client")?;

    Ok(Session::new(
        Arc::new(model),
        Arc::new(backend),
        InteractionLog::new(&config.agent.log_file),
        SessionSettings::from_config(config, instructions),
    ))
}

fn report_startup_error(error: &SheetAiError) {
    let red = Style::new().red();
    eprintln!("{} {}", red.apply_to("Error:"), error.user_message());
    if error.requires_user_action() {
        eprintln!("Run `sheetai config` to see the settings in effect.");
    }
}

fn print_config(config: &Config, path: Option<&std::path::Path>) {
    let bold = Style::new().bold();
    let green = Style::new().green();
    let masked = |secret: &Option<String>| {
        secret
            .as_deref()
            .map(mask_secret)
            .unwrap_or_else(|| "(not set)".to_string())
    };

    println!("{}", bold.apply_to("Current Configuration:"));
    match path {
        Some(path) if path.exists() => println!("- File: {}", green.apply_to(path.display())),
        Some(path) => println!("- File: {} (not found, using defaults)", path.display()),
        None => println!("- File: (none)"),
    }

    println!();
    println!("{}", bold.apply_to("[llm]"));
    println!("- Provider: {}", config.llm.provider);
    println!("- Base URL: {}", config.llm.base_url);
    println!("- Model: {}", green.apply_to(&config.llm.model));
    println!("- API key: {}", masked(&config.llm.api_key));
    println!("- Timeout: {}s", config.llm.timeout_secs);

    println!();
    println!("{}", bold.apply_to("[sheets]"));
    println!(
        "- Spreadsheet: {}",
        config.sheets.spreadsheet_id.as_deref().unwrap_or("(not set)")
    );
    println!("- Base URL: {}", config.sheets.base_url);
    println!("- Credentials: {}", config.sheets.credentials_path.display());
    println!("- Token: {}", config.sheets.token_path.display());
    println!("- Access token: {}", masked(&config.sheets.access_token));

    println!();
    println!("{}", bold.apply_to("[agent]"));
    println!("- Instructions: {}", config.agent.instructions_path.display());
    println!("- Log file: {}", config.agent.log_file.display());
    println!("- Max history: {}", config.agent.max_history);
    println!("- Command delay: {}ms", config.agent.command_delay_ms);
}
