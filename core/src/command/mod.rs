//! Spreadsheet command model
//!
//! A [`Command`] is the JSON object the model emitted, kept verbatim. It is
//! checked into an [`Operation`] right before execution; anything that fails
//! the check becomes a [`CommandError`] and never reaches the backend.

pub mod executor;
pub mod parser;
pub mod runner;

pub use executor::CommandExecutor;
pub use parser::{parse_response, ParseError};
pub use runner::{BatchReport, BatchRunner};

use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::SheetAiError;
use crate::sheets::{Rows, SheetProperties};

/// The six supported actions, spelled as the model must spell them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
    CreateSheet,
    List,
    Clear,
    DeleteSheet,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Read,
        Action::Write,
        Action::CreateSheet,
        Action::List,
        Action::Clear,
        Action::DeleteSheet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "READ",
            Action::Write => "WRITE",
            Action::CreateSheet => "CREATESHEET",
            Action::List => "LIST",
            Action::Clear => "CLEAR",
            Action::DeleteSheet => "DELETESHEET",
        }
    }
}

impl FromStr for Action {
    type Err = CommandError;

    /// Exact, case-sensitive match
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| CommandError::UnknownAction(s.to_string()))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single command produced no result
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Invalid command: Missing 'action'.")]
    MissingAction,

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid command: Missing range for {0} action.")]
    MissingRange(Action),

    #[error("Missing 'values' for {0} action.")]
    MissingValues(Action),

    #[error("'values' for {0} must be a list of rows.")]
    MalformedValues(Action),

    #[error("Missing sheet name for {0}.")]
    MissingSheetTitle(Action),

    #[error("Sheet '{0}' not found.")]
    SheetNotFound(String),

    #[error(transparent)]
    Backend(#[from] SheetAiError),
}

/// A checked command, ready for exactly one backend round-trip
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Read { range: String },
    Write { range: String, rows: Rows },
    CreateSheet { title: String },
    List,
    Clear { range: String },
    DeleteSheet { title: String },
}

/// One command object as emitted by the model
#[derive(Debug, Clone, PartialEq)]
pub struct Command(Value);

impl Command {
    pub fn new(raw: Value) -> Self {
        Command(raw)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Raw `action` text; non-string actions are rendered as JSON
    pub fn action(&self) -> Option<String> {
        match self.0.get("action")? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn range(&self) -> Option<&str> {
        self.0
            .get("range")
            .and_then(Value::as_str)
            .filter(|r| !r.is_empty())
    }

    pub fn values(&self) -> Option<&Value> {
        self.0.get("values").filter(|v| !v.is_null())
    }

    /// Only a literal `true` asks for a summary
    pub fn wants_summary(&self) -> bool {
        self.0.get("summary").and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn is_read(&self) -> bool {
        self.action().as_deref() == Some(Action::Read.as_str())
    }

    /// Check presence of the fields `action` needs
    pub fn validate(&self) -> Result<Operation, CommandError> {
        let action: Action = self.action().ok_or(CommandError::MissingAction)?.parse()?;

        let range = || {
            self.range()
                .map(str::to_string)
                .ok_or(CommandError::MissingRange(action))
        };

        match action {
            Action::Read => Ok(Operation::Read { range: range()? }),
            Action::Write => {
                let range = range()?;
                let rows = self.rows(action)?;
                Ok(Operation::Write { range, rows })
            }
            Action::CreateSheet => Ok(Operation::CreateSheet {
                title: self.title(action)?,
            }),
            Action::List => Ok(Operation::List),
            Action::Clear => Ok(Operation::Clear { range: range()? }),
            Action::DeleteSheet => Ok(Operation::DeleteSheet {
                title: self.title(action)?,
            }),
        }
    }

    fn rows(&self, action: Action) -> Result<Rows, CommandError> {
        let values = match self.values() {
            Some(Value::Array(rows)) if !rows.is_empty() => rows,
            Some(Value::Array(_)) | None => return Err(CommandError::MissingValues(action)),
            Some(_) => return Err(CommandError::MalformedValues(action)),
        };
        values
            .iter()
            .map(|row| match row {
                Value::Array(cells) => Ok(cells.clone()),
                _ => Err(CommandError::MalformedValues(action)),
            })
            .collect()
    }

    /// Sheet name carried at `values[0][0]`
    fn title(&self, action: Action) -> Result<String, CommandError> {
        let cell = self
            .values()
            .and_then(|v| v.get(0))
            .and_then(|row| row.get(0));
        match cell {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(Value::Number(n)) if n.as_f64() != Some(0.0) => Ok(n.to_string()),
            Some(Value::Bool(true)) => Ok("True".to_string()),
            _ => Err(CommandError::MissingSheetTitle(action)),
        }
    }
}

impl From<Value> for Command {
    fn from(raw: Value) -> Self {
        Command(raw)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a successful command produced
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// READ: the rows fetched, possibly none
    Rows(Rows),
    /// WRITE: cells the backend reports as updated
    Updated { cells: u64, response: Value },
    /// LIST: every tab, in spreadsheet order
    Sheets(Vec<SheetProperties>),
    Created { title: String, response: Value },
    Cleared { range: String, response: Value },
    Deleted { title: String, response: Value },
}

impl CommandOutcome {
    /// Rows and sheet lists feed the summary call
    pub fn is_sequence(&self) -> bool {
        matches!(self, CommandOutcome::Rows(_) | CommandOutcome::Sheets(_))
    }

    /// Form used in the interaction log and in execution feedback
    pub fn to_json(&self) -> Value {
        match self {
            CommandOutcome::Rows(rows) => {
                Value::Array(rows.iter().cloned().map(Value::Array).collect())
            }
            CommandOutcome::Sheets(sheets) => Value::Array(
                sheets
                    .iter()
                    .map(|s| Value::String(s.title.clone()))
                    .collect(),
            ),
            CommandOutcome::Updated { response, .. }
            | CommandOutcome::Created { response, .. }
            | CommandOutcome::Cleared { response, .. }
            | CommandOutcome::Deleted { response, .. } => response.clone(),
        }
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutcome::Rows(rows) => write!(f, "Read {} rows", rows.len()),
            CommandOutcome::Updated { cells, .. } => write!(f, "Updated {} cells.", cells),
            CommandOutcome::Sheets(sheets) => write!(f, "{} sheet(s)", sheets.len()),
            CommandOutcome::Created { title, .. } => write!(f, "Created new sheet '{}'.", title),
            CommandOutcome::Cleared { range, .. } => write!(f, "Cleared range {}.", range),
            CommandOutcome::Deleted { title, .. } => write!(f, "Deleted sheet '{}'.", title),
        }
    }
}
