//! Conversation turn orchestration
//!
//! A [`Session`] owns the bounded history and runs one user turn at a time:
//! model call, command batch, log entry, execution feedback, optional summary.
//! No error escapes a turn; failures are printed, logged and the session
//! stays usable.

pub mod history;

pub use history::ConversationHistory;

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::command::{parse_response, BatchReport, BatchRunner, Command};
use crate::config::{Config, DEFAULT_SUMMARY_INSTRUCTIONS};
use crate::error::Result;
use crate::journal::{InteractionLog, CONNECTION_ERROR_MARKER, NO_MODEL_OUTPUT};
use crate::llm::{ChatMessage, LanguageModel};
use crate::output::OutputFormatter;
use crate::sheets::SheetsBackend;

/// Fixed knobs of a session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// System instructions for the command translator
    pub instructions: String,
    /// Instructions for the follow-up summary call
    pub summary_instructions: String,
    /// Turns kept after each user turn
    pub max_history: usize,
    /// Pause between commands of a batch
    pub command_delay: Duration,
}

impl SessionSettings {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            summary_instructions: DEFAULT_SUMMARY_INSTRUCTIONS.to_string(),
            max_history: 10,
            command_delay: Duration::from_secs(1),
        }
    }

    pub fn from_config(config: &Config, instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            summary_instructions: config.agent.summary_instructions.clone(),
            max_history: config.agent.max_history.max(1),
            command_delay: config.command_delay(),
        }
    }
}

/// What happened during one turn
#[derive(Debug, Clone, Default)]
pub struct TurnReport {
    /// Raw model output, when the model answered
    pub ai_output: Option<String>,
    /// Batch results, when at least one command was parsed
    pub batch: Option<BatchReport>,
    /// Summary answer, when one was requested and produced
    pub summary: Option<String>,
    /// Description of the fault that aborted the turn
    pub error: Option<String>,
}

/// One interactive agent session
pub struct Session {
    model: Arc<dyn LanguageModel>,
    backend: Arc<dyn SheetsBackend>,
    log: InteractionLog,
    output: OutputFormatter,
    settings: SessionSettings,
    history: ConversationHistory,
}

impl Session {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        backend: Arc<dyn SheetsBackend>,
        log: InteractionLog,
        settings: SessionSettings,
    ) -> Self {
        Self {
            model,
            backend,
            log,
            output: OutputFormatter::new(),
            settings,
            history: ConversationHistory::new(),
        }
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn output(&self) -> &OutputFormatter {
        &self.output
    }

    /// Run one user turn to completion. Never fails; see [`TurnReport::error`].
    pub async fn handle_turn(&mut self, input: &str) -> TurnReport {
        let report = match self.process(input).await {
            Ok(report) => report,
            Err(e) => {
                self.output.print_turn_error(&e);
                let result = if e.is_connectivity() {
                    error!("Model service unreachable: {}", e);
                    CONNECTION_ERROR_MARKER.to_string()
                } else {
                    error!("Turn failed: {}", e);
                    e.to_string()
                };
                self.log_turn(input, NO_MODEL_OUTPUT, &result).await;
                TurnReport {
                    error: Some(e.to_string()),
                    ..TurnReport::default()
                }
            }
        };

        self.history.trim(self.settings.max_history);
        report
    }

    async fn process(&mut self, input: &str) -> Result<TurnReport> {
        self.history.push(ChatMessage::user(input));

        let ai_output = self
            .model
            .respond(&self.settings.instructions, self.history.turns())
            .await?;
        self.history.push(ChatMessage::assistant(ai_output.clone()));
        self.output.print_ai_command(&ai_output);

        let commands = match parse_response(&ai_output) {
            Ok(commands) => commands,
            Err(e) => {
                warn!("Unusable model output: {}", e);
                self.output.print_parse_error(&e);
                Vec::new()
            }
        };

        let batch = if commands.is_empty() {
            None
        } else {
            let runner = BatchRunner::new(
                self.backend.as_ref(),
                self.settings.command_delay,
                &self.output,
            );
            Some(runner.run(&commands).await)
        };

        let result = batch
            .as_ref()
            .map_or(Value::Null, BatchReport::to_json)
            .to_string();
        self.log.record(input, &ai_output, &result).await?;
        self.output.print_action_logged();

        if batch.as_ref().is_some_and(|b| !b.is_empty()) {
            self.history.push(ChatMessage::user(format!(
                "[SYSTEM] Command executed. Result: {}",
                result
            )));
        }

        let summary = match &batch {
            Some(batch) if wants_summary(&commands) => self.summarize(input, batch).await?,
            _ => None,
        };

        Ok(TurnReport {
            ai_output: Some(ai_output),
            batch,
            summary,
            error: None,
        })
    }

    /// Second model call answering the question from READ / LIST data
    async fn summarize(&mut self, input: &str, batch: &BatchReport) -> Result<Option<String>> {
        let data = batch.sequence_results();
        if data.is_empty() {
            info!("Summary requested but no row or sheet data came back");
            return Ok(None);
        }

        let request = ChatMessage::user(format!(
            "User asked: {}\n\nData:\n{}",
            input,
            Value::Array(data)
        ));
        let answer = self
            .model
            .respond(&self.settings.summary_instructions, &[request])
            .await?;

        self.output.print_summary(&answer);
        self.history.push(ChatMessage::assistant(answer.clone()));
        Ok(Some(answer))
    }

    async fn log_turn(&self, input: &str, ai_command: &str, result: &str) {
        match self.log.record(input, ai_command, result).await {
            Ok(()) => self.output.print_action_logged(),
            Err(e) => warn!("Could not write {}: {}", self.log.path().display(), e),
        }
    }
}

/// Only the last command of a batch may ask for a summary
fn wants_summary(commands: &[Command]) -> bool {
    commands.last().is_some_and(Command::wants_summary)
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("log", &self.log)
            .field("settings", &self.settings)
            .field("history_len", &self.history.len())
            .finish()
    }
}
