//! Output formatting module
//!
//! Console lines for the REPL: banner, command progress, per-command
//! diagnostics and results, using colored output.

use console::Style;

use crate::command::{Action, CommandError, CommandOutcome, ParseError};
use crate::error::SheetAiError;

/// Example phrasing shown by `--help`, one per action
const HELP_LINES: [(Action, &str); 6] = [
    (Action::Read, "READ range: Read data from a range (e.g. 'READ Sheet1!A1:B2')"),
    (
        Action::Write,
        "WRITE range values: Write values to a range (e.g. 'WRITE Sheet1!A1 [[\"Hello\", \"World\"]]')",
    ),
    (
        Action::CreateSheet,
        "CREATESHEET sheetname: Create a new sheet (e.g. 'CREATESHEET NewSheet')",
    ),
    (Action::List, "LIST: List all sheets in the spreadsheet"),
    (Action::Clear, "CLEAR range: Clear values in a range (e.g. 'CLEAR Sheet1!A1:B2')"),
    (
        Action::DeleteSheet,
        "DELETESHEET sheetname: Delete a sheet (e.g. 'DELETESHEET OldSheet')",
    ),
];

/// Output formatter for REPL results
pub struct OutputFormatter {
    blue: Style,
    green: Style,
    yellow: Style,
    red: Style,
    bold: Style,
    dim: Style,
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self {
            blue: Style::new().blue(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            bold: Style::new().bold(),
            dim: Style::new().dim(),
        }
    }
}

impl OutputFormatter {
    /// Create a new formatter
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print_welcome(&self) {
        println!("{}", self.bold.apply_to("Welcome to the AI Spreadsheet Agent!"));
        println!("Type 'quit' or 'exit' to stop. '--help' for available commands.");
        println!();
    }

    /// The six actions with example phrasing
    pub fn print_help(&self) {
        println!();
        println!("{}", self.bold.apply_to("Available commands:"));
        for (action, line) in HELP_LINES {
            let rest = line.strip_prefix(action.as_str()).unwrap_or(line);
            println!("  - {}{}", self.green.apply_to(action.as_str()), rest);
        }
    }

    /// Raw model output for the turn
    pub fn print_ai_command(&self, text: &str) {
        println!("{} {}", self.blue.apply_to("AI command:"), text);
    }

    pub fn print_batch_start(&self, total: usize) {
        println!();
        println!("Executing {} command(s)...", total);
        println!();
    }

    pub fn print_command_header(&self, index: usize, total: usize, action: Option<&str>) {
        println!(
            "{}",
            self.bold.apply_to(format!(
                "--- Command {}/{}: {} ---",
                index,
                total,
                action.unwrap_or("(none)")
            ))
        );
    }

    pub fn print_outcome(&self, outcome: &CommandOutcome) {
        match outcome {
            CommandOutcome::Rows(rows) => {
                println!("Read {} rows:", rows.len());
                for row in rows {
                    println!("{}", serde_json::Value::Array(row.clone()));
                }
            }
            CommandOutcome::Sheets(sheets) => {
                println!();
                println!("{}", self.bold.apply_to("Sheets in spreadsheet:"));
                for sheet in sheets {
                    println!(
                        "  • {} {}",
                        self.green.apply_to(&sheet.title),
                        self.dim.apply_to(format!(
                            "({} rows X {} cols)",
                            sheet.row_count, sheet.column_count
                        ))
                    );
                }
            }
            other => println!("{}", self.green.apply_to(other)),
        }
    }

    pub fn print_command_error(&self, error: &CommandError) {
        match error {
            CommandError::Backend(SheetAiError::BackendError { status, message }) => println!(
                "{} {} ({})",
                self.red.apply_to("Google Sheets API error:"),
                message,
                status
            ),
            other => println!("{} {}", self.red.apply_to("Error:"), other),
        }
    }

    pub fn print_stopped(&self, index: usize) {
        println!(
            "{}",
            self.yellow
                .apply_to(format!("Command {} failed. Stopping execution.", index))
        );
    }

    pub fn print_completed(&self, completed: usize, total: usize) {
        println!();
        println!("Completed {}/{} commands.", completed, total);
    }

    pub fn print_parse_error(&self, error: &ParseError) {
        println!("{} {}", self.red.apply_to("Error:"), error);
    }

    /// Natural-language answer from the summary call
    pub fn print_summary(&self, text: &str) {
        println!();
        println!("{} {}", self.bold.apply_to("AI:"), text);
    }

    pub fn print_action_logged(&self) {
        println!("{}", self.dim.apply_to("Action logged."));
    }

    /// Turn aborted; connectivity failures get a fixed line
    pub fn print_turn_error(&self, error: &SheetAiError) {
        if error.is_connectivity() {
            println!(
                "{}",
                self.red.apply_to("Failed to connect to the language model API.")
            );
        } else {
            println!("{} {}", self.red.apply_to("Error:"), error);
        }
    }
}
