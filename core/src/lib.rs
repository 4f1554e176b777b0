pub mod command;
pub mod config;
pub mod error;
pub mod journal;
pub mod llm;
pub mod output;
pub mod session;
pub mod sheets;
pub mod util;

// Re-exports for convenience
pub use command::{parse_response, BatchReport, BatchRunner, Command, CommandExecutor, CommandOutcome};
pub use config::Config;
pub use error::{Result, SheetAiError};
pub use journal::{InteractionLog, LogEntry};
pub use llm::{ChatMessage, LanguageModel, LlmClient};
pub use session::{Session, SessionSettings, TurnReport};
pub use sheets::{SheetProperties, SheetsBackend, SheetsClient};
