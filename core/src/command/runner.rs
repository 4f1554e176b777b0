//! Sequential batch execution with stop-on-failure and pacing

use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use super::{Command, CommandExecutor, CommandOutcome};
use crate::output::OutputFormatter;
use crate::sheets::SheetsBackend;

/// Per-command results of one batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Commands in the batch
    pub total: usize,
    /// One slot per command actually run; `None` where it failed
    pub results: Vec<Option<CommandOutcome>>,
}

impl BatchReport {
    /// Commands actually run, the failed one included
    pub fn completed(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// `null` for failed slots
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.results
                .iter()
                .map(|slot| slot.as_ref().map_or(Value::Null, CommandOutcome::to_json))
                .collect(),
        )
    }

    /// Results from READ / LIST, in batch order
    pub fn sequence_results(&self) -> Vec<Value> {
        self.results
            .iter()
            .flatten()
            .filter(|outcome| outcome.is_sequence())
            .map(CommandOutcome::to_json)
            .collect()
    }
}

/// Runs a batch in order, one command at a time
pub struct BatchRunner<'a> {
    executor: CommandExecutor<'a>,
    delay: Duration,
    output: &'a OutputFormatter,
}

impl<'a> BatchRunner<'a> {
    pub fn new(backend: &'a dyn SheetsBackend, delay: Duration, output: &'a OutputFormatter) -> Self {
        Self {
            executor: CommandExecutor::new(backend),
            delay,
            output,
        }
    }

    /// Execute `commands` in order. A failed non-READ command ends the batch;
    /// the pause runs between commands, never after the last.
    pub async fn run(&self, commands: &[Command]) -> BatchReport {
        let total = commands.len();
        let mut report = BatchReport {
            total,
            results: Vec::with_capacity(total),
        };

        self.output.print_batch_start(total);

        for (index, command) in commands.iter().enumerate() {
            let position = index + 1;
            let action = command.action();
            self.output
                .print_command_header(position, total, action.as_deref());

            let result = match self.executor.execute(command).await {
                Ok(outcome) => {
                    self.output.print_outcome(&outcome);
                    Some(outcome)
                }
                Err(e) => {
                    self.output.print_command_error(&e);
                    None
                }
            };
            let failed = result.is_none();
            report.results.push(result);

            if failed && !command.is_read() {
                warn!("Command {}/{} ({}) failed; skipping the rest", position, total, command);
                self.output.print_stopped(position);
                break;
            }

            if position < total && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        info!("Batch finished: {}/{} commands run", report.completed(), total);
        self.output.print_completed(report.completed(), total);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::testing::{Call, FakeBackend};
    use serde_json::json;
    use tokio::time::Instant;

    fn batch(raw: Value) -> Vec<Command> {
        match raw {
            Value::Array(items) => items.into_iter().map(Command::new).collect(),
            other => vec![Command::new(other)],
        }
    }

    #[tokio::test]
    async fn test_runs_all_commands_in_order() {
        let backend = FakeBackend::new().with_sheet(0, "Sheet1");
        let output = OutputFormatter::new();
        let runner = BatchRunner::new(&backend, Duration::ZERO, &output);

        let report = runner
            .run(&batch(json!([
                {"action": "CREATESHEET", "values": [["Q3"]]},
                {"action": "WRITE", "range": "Q3!A1", "values": [["a", "b"]]},
                {"action": "LIST"}
            ])))
            .await;

        assert_eq!(report.total, 3);
        assert_eq!(report.completed(), 3);
        assert!(report.results.iter().all(Option::is_some));
        assert_eq!(
            backend.calls(),
            vec![
                Call::AddSheet("Q3".into()),
                Call::Update("Q3!A1".into(), vec![vec![json!("a"), json!("b")]]),
                Call::List,
            ]
        );
    }

    #[tokio::test]
    async fn test_stops_after_failed_write() {
        let backend = FakeBackend::new().failing_on("Locked!A1");
        let output = OutputFormatter::new();
        let runner = BatchRunner::new(&backend, Duration::ZERO, &output);

        let report = runner
            .run(&batch(json!([
                {"action": "READ", "range": "Sheet1!A1"},
                {"action": "WRITE", "range": "Locked!A1", "values": [["x"]]},
                {"action": "CLEAR", "range": "Sheet1!A1:B2"},
                {"action": "LIST"}
            ])))
            .await;

        // the failed command keeps its slot; nothing after it runs
        assert_eq!(report.total, 4);
        assert_eq!(report.completed(), 2);
        assert!(report.results[0].is_some());
        assert!(report.results[1].is_none());
        assert!(!backend.calls().contains(&Call::Clear("Sheet1!A1:B2".into())));
        assert!(!backend.calls().contains(&Call::List));
        assert_eq!(report.to_json(), json!([[], null]));
    }

    #[tokio::test]
    async fn test_invalid_command_also_stops_batch() {
        let backend = FakeBackend::new();
        let output = OutputFormatter::new();
        let runner = BatchRunner::new(&backend, Duration::ZERO, &output);

        let report = runner
            .run(&batch(json!([
                {"action": "WRITE", "range": "Sheet1!A1"},
                {"action": "LIST"}
            ])))
            .await;

        assert_eq!(report.results, vec![None]);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_read_does_not_stop_batch() {
        let backend = FakeBackend::new()
            .with_sheet(0, "Sheet1")
            .failing_on("Locked!A1:B2");
        let output = OutputFormatter::new();
        let runner = BatchRunner::new(&backend, Duration::ZERO, &output);

        let report = runner
            .run(&batch(json!([
                {"action": "READ", "range": "Locked!A1:B2"},
                {"action": "READ"},
                {"action": "LIST"}
            ])))
            .await;

        assert_eq!(report.completed(), 3);
        assert!(report.results[0].is_none());
        assert!(report.results[1].is_none());
        assert_eq!(report.sequence_results(), vec![json!(["Sheet1"])]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pauses_between_commands_only() {
        let backend = FakeBackend::new();
        let output = OutputFormatter::new();
        let runner = BatchRunner::new(&backend, Duration::from_secs(1), &output);

        let started = Instant::now();
        runner
            .run(&batch(json!([
                {"action": "LIST"},
                {"action": "LIST"},
                {"action": "LIST"}
            ])))
            .await;
        assert_eq!(started.elapsed(), Duration::from_secs(2));

        let started = Instant::now();
        runner.run(&batch(json!({"action": "LIST"}))).await;
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_pause_after_stopping() {
        let backend = FakeBackend::new();
        let output = OutputFormatter::new();
        let runner = BatchRunner::new(&backend, Duration::from_secs(1), &output);

        let started = Instant::now();
        runner
            .run(&batch(json!([
                {"action": "LIST"},
                {"action": "CLEAR"},
                {"action": "LIST"}
            ])))
            .await;
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[test]
    fn test_sequence_results_skip_confirmations() {
        let report = BatchReport {
            total: 3,
            results: vec![
                Some(CommandOutcome::Rows(vec![vec![json!(1)]])),
                Some(CommandOutcome::Updated {
                    cells: 1,
                    response: json!({"updatedCells": 1}),
                }),
                None,
            ],
        };
        assert_eq!(report.sequence_results(), vec![json!([[1]])]);
        assert!(!report.is_empty());
    }
}
