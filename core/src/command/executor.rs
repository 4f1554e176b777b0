//! Single-command execution against a [`SheetsBackend`]

use serde_json::Value;
use tracing::{debug, warn};

use super::{Command, CommandError, CommandOutcome, Operation};
use crate::sheets::SheetsBackend;

/// Runs one checked command as one backend call (two for DELETESHEET: lookup, then delete)
pub struct CommandExecutor<'a> {
    backend: &'a dyn SheetsBackend,
}

impl<'a> CommandExecutor<'a> {
    pub fn new(backend: &'a dyn SheetsBackend) -> Self {
        Self { backend }
    }

    /// Validate and run `command`. Invalid commands never touch the backend;
    /// backend failures come back as [`CommandError::Backend`].
    pub async fn execute(&self, command: &Command) -> Result<CommandOutcome, CommandError> {
        let operation = command.validate()?;
        debug!("Executing {:?}", operation);

        let outcome = self.run(operation).await;
        if let Err(CommandError::Backend(e)) = &outcome {
            warn!("Spreadsheet call for {} failed: {}", command, e);
        }
        outcome
    }

    async fn run(&self, operation: Operation) -> Result<CommandOutcome, CommandError> {
        match operation {
            Operation::Read { range } => {
                let rows = self.backend.get_values(&range).await?;
                Ok(CommandOutcome::Rows(rows))
            }
            Operation::Write { range, rows } => {
                let response = self.backend.update_values(&range, &rows).await?;
                let cells = response
                    .get("updatedCells")
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                Ok(CommandOutcome::Updated { cells, response })
            }
            Operation::CreateSheet { title } => {
                let response = self.backend.add_sheet(&title).await?;
                Ok(CommandOutcome::Created { title, response })
            }
            Operation::List => {
                let sheets = self.backend.list_sheets().await?;
                Ok(CommandOutcome::Sheets(sheets))
            }
            Operation::Clear { range } => {
                let response = self.backend.clear_values(&range).await?;
                Ok(CommandOutcome::Cleared { range, response })
            }
            Operation::DeleteSheet { title } => {
                // Linear scan; first tab with this exact title
                let sheet_id = self
                    .backend
                    .list_sheets()
                    .await?
                    .into_iter()
                    .find(|sheet| sheet.title == title)
                    .map(|sheet| sheet.sheet_id)
                    .ok_or_else(|| CommandError::SheetNotFound(title.clone()))?;

                let response = self.backend.delete_sheet(sheet_id).await?;
                Ok(CommandOutcome::Deleted { title, response })
            }
        }
    }
}
