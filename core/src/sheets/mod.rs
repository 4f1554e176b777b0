//! Spreadsheet backend boundary
//!
//! Six operations keyed by one spreadsheet id. [`SheetsClient`] talks to the
//! Google Sheets v4 REST API; tests substitute an in-memory fake.

pub mod auth;
pub mod client;

pub use auth::{AuthorizedUser, Credentials, InstalledApp, TokenSource};
pub use client::SheetsClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Row-major grid of cell values
pub type Rows = Vec<Vec<Value>>;

/// One tab of the spreadsheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
    pub row_count: u64,
    pub column_count: u64,
}

/// Remote spreadsheet operations
#[async_trait]
pub trait SheetsBackend: Send + Sync {
    /// Cell values of `range`; empty when the range holds nothing
    async fn get_values(&self, range: &str) -> Result<Rows>;

    /// Overwrite `range` verbatim (no formula parsing); returns the raw confirmation
    async fn update_values(&self, range: &str, rows: &[Vec<Value>]) -> Result<Value>;

    /// Add a tab titled `title`; returns the raw confirmation
    async fn add_sheet(&self, title: &str) -> Result<Value>;

    /// All tabs in spreadsheet order
    async fn list_sheets(&self) -> Result<Vec<SheetProperties>>;

    /// Clear cell contents of `range`, keeping the tab
    async fn clear_values(&self, range: &str) -> Result<Value>;

    /// Remove the tab with internal id `sheet_id`
    async fn delete_sheet(&self, sheet_id: i64) -> Result<Value>;
}
