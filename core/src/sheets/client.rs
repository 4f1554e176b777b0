//! Google Sheets v4 REST client

use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, error};

use super::{Rows, SheetProperties, SheetsBackend, TokenSource};
use crate::error::{Result, SheetAiError};
use crate::util::{sanitize_base_url, validate_bearer};

/// Spreadsheet backend bound to one spreadsheet id
pub struct SheetsClient {
    base_url: String,
    spreadsheet_id: String,
    tokens: TokenSource,
    http_client: HttpClient,
}

impl SheetsClient {
    pub fn new(base_url: &str, spreadsheet_id: &str, tokens: TokenSource) -> Result<Self> {
        let base_url = sanitize_base_url(base_url, "sheets.base_url")?;
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("sheetai/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SheetAiError::Internal {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url,
            spreadsheet_id: spreadsheet_id.trim().to_string(),
            tokens,
            http_client,
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/v4/spreadsheets/{}", self.base_url, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> String {
        format!("{}/values/{}", self.spreadsheet_url(), urlencoding::encode(range))
    }

    async fn send(&self, label: &str, request: RequestBuilder) -> Result<Value> {
        let token = self.tokens.bearer().await?;
        let token = validate_bearer(&token, "sheets.access_token")?;

        let started = Instant::now();
        let response = request.bearer_auth(token).send().await.map_err(|e| {
            error!("Sheets {} failed after {:?}: {}", label, started.elapsed(), e);
            SheetAiError::from(e)
        })?;

        let status = response.status();
        let body = response.text().await?;
        debug!("Sheets {} answered {} in {:?}", label, status.as_u16(), started.elapsed());

        if !status.is_success() {
            return Err(backend_error(status, &body));
        }
        if body.trim().is_empty() {
            return Ok(json!({}));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn batch_update(&self, request: Value) -> Result<Value> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        let body = json!({ "requests": [request] });
        self.send("batchUpdate", self.http_client.post(url).json(&body))
            .await
    }
}

#[async_trait]
impl SheetsBackend for SheetsClient {
    async fn get_values(&self, range: &str) -> Result<Rows> {
        let raw = self
            .send("values.get", self.http_client.get(self.values_url(range)))
            .await?;
        let parsed: ValueRange = serde_json::from_value(raw)?;
        Ok(parsed.values)
    }

    async fn update_values(&self, range: &str, rows: &[Vec<Value>]) -> Result<Value> {
        let request = self
            .http_client
            .put(self.values_url(range))
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "range": range, "values": rows }));
        self.send("values.update", request).await
    }

    async fn add_sheet(&self, title: &str) -> Result<Value> {
        self.batch_update(json!({ "addSheet": { "properties": { "title": title } } }))
            .await
    }

    async fn list_sheets(&self) -> Result<Vec<SheetProperties>> {
        let request = self
            .http_client
            .get(self.spreadsheet_url())
            .query(&[("fields", "sheets.properties")]);
        let raw = self.send("get", request).await?;
        let parsed: Spreadsheet = serde_json::from_value(raw)?;
        Ok(parsed
            .sheets
            .into_iter()
            .map(|sheet| sheet.properties.into())
            .collect())
    }

    async fn clear_values(&self, range: &str) -> Result<Value> {
        let url = format!("{}:clear", self.values_url(range));
        self.send("values.clear", self.http_client.post(url).json(&json!({})))
            .await
    }

    async fn delete_sheet(&self, sheet_id: i64) -> Result<Value> {
        self.batch_update(json!({ "deleteSheet": { "sheetId": sheet_id } }))
            .await
    }
}

/// Non-2xx answer to `BackendError`, preferring the API's own message
fn backend_error(status: StatusCode, body: &str) -> SheetAiError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });

    SheetAiError::BackendError {
        status: status.as_u16(),
        message,
    }
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Rows,
}

#[derive(Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Deserialize)]
struct Sheet {
    properties: RawSheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSheetProperties {
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: u64,
    #[serde(default)]
    column_count: u64,
}

impl From<RawSheetProperties> for SheetProperties {
    fn from(raw: RawSheetProperties) -> Self {
        SheetProperties {
            sheet_id: raw.sheet_id,
            title: raw.title,
            row_count: raw.grid_properties.row_count,
            column_count: raw.grid_properties.column_count,
        }
    }
}
