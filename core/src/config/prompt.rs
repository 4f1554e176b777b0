//! System instructions for the command translator

use std::path::Path;
use tracing::{info, warn};

use crate::error::Result;

/// Used when no instructions file exists
pub const DEFAULT_INSTRUCTIONS: &str = r#"You translate spreadsheet requests into JSON commands.

Reply with JSON only: one object, or an array of objects executed in order.

Each object has:
- "action": one of READ, WRITE, CREATESHEET, LIST, CLEAR, DELETESHEET
- "range": A1 notation such as "Sheet1!A1:B2" (READ, WRITE, CLEAR)
- "values": rows of cells, e.g. [["Name", "Age"], ["Ada", 36]] (WRITE);
  for CREATESHEET and DELETESHEET the sheet name goes in [["<name>"]]
- "summary": true on the LAST object when the user asked a question that
  should be answered from the data that was read

Examples:
"show A1 to B2 on Sheet1" -> {"action": "READ", "range": "Sheet1!A1:B2"}
"put hello in A1" -> {"action": "WRITE", "range": "Sheet1!A1", "values": [["hello"]]}
"make a sheet called Budget" -> {"action": "CREATESHEET", "values": [["Budget"]]}
"which sheets do I have?" -> {"action": "LIST", "summary": true}
"wipe Sheet1 A1:C10" -> {"action": "CLEAR", "range": "Sheet1!A1:C10"}
"delete the Old sheet" -> {"action": "DELETESHEET", "values": [["Old"]]}

Messages starting with [SYSTEM] report the outcome of your previous commands.
"#;

/// Read the instructions file, falling back to the built-in text when absent
pub fn load_instructions(path: &Path) -> Result<String> {
    if !path.exists() {
        warn!(
            "Instructions file {} not found, using built-in instructions",
            path.display()
        );
        return Ok(DEFAULT_INSTRUCTIONS.to_string());
    }

    let content = std::fs::read_to_string(path)?;
    info!("Loaded instructions from {} ({} bytes)", path.display(), content.len());
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_default() {
        let dir = TempDir::new().unwrap();
        let text = load_instructions(&dir.path().join("instructions.txt")).unwrap();
        assert_eq!(text, DEFAULT_INSTRUCTIONS);
    }

    #[test]
    fn test_file_is_read_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("instructions.txt");
        std::fs::write(&path, "Only emit LIST.").unwrap();
        assert_eq!(load_instructions(&path).unwrap(), "Only emit LIST.");
    }

    #[test]
    fn test_default_mentions_every_action() {
        for action in ["READ", "WRITE", "CREATESHEET", "LIST", "CLEAR", "DELETESHEET"] {
            assert!(DEFAULT_INSTRUCTIONS.contains(action), "{} missing", action);
        }
    }
}
