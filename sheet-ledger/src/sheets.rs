//! Google Sheets v4 REST store

use crate::config::LedgerConfig;
use crate::error::{Error, Result};
use crate::metrics::STORE_CALL_DURATION;
use crate::oauth::{ServiceAccountKey, ServiceAccountTokenSource, TokenSource};
use crate::range::A1Range;
use crate::store::TabularStore;
use crate::types::{AppendOutcome, CellStyle, FormatRequest, PartitionInfo, Row};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const STORE_NAME: &str = "google_sheets";

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    title: String,
}

impl From<SheetProperties> for PartitionInfo {
    fn from(p: SheetProperties) -> Self {
        PartitionInfo {
            title: p.title,
            partition_id: p.sheet_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<BatchReply>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchReply {
    add_sheet: Option<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct AppendResponse {
    updates: AppendUpdates,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    updated_range: String,
}

/// Tabular store backed by one Google spreadsheet
#[derive(Debug, Clone)]
pub struct GoogleSheetsStore {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
    tokens: Arc<dyn TokenSource>,
}

impl GoogleSheetsStore {
    /// Store for `spreadsheet_id` under `base_url`
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            spreadsheet_id: spreadsheet_id.into(),
            tokens,
        }
    }

    /// Store authenticated with the configured service account for `scope`
    pub fn from_config(config: &LedgerConfig, scope: &str) -> Result<Self> {
        let credentials = config
            .credentials_json
            .as_deref()
            .ok_or_else(|| Error::Config("Service account credentials are required".to_string()))?;
        let mut key = ServiceAccountKey::from_json(credentials)?;
        if let Some(uri) = &config.token_uri {
            key.token_uri = uri.clone();
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let tokens = ServiceAccountTokenSource::new(key, scope, http.clone())?;

        Ok(Self::new(
            http,
            config.sheets_base_url.clone(),
            config.spreadsheet_id.clone(),
            Arc::new(tokens),
        ))
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("Invalid Sheets base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config("Sheets base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push("spreadsheets")
            .extend(segments);
        Ok(url)
    }

    fn spreadsheet_url(&self, suffix: &str) -> Result<Url> {
        let id = format!("{}{}", self.spreadsheet_id, suffix);
        self.url(&[&id])
    }

    fn values_url(&self, partition: &str, range: &A1Range, suffix: &str) -> Result<Url> {
        let target = format!("{}{}", range.qualified(partition), suffix);
        self.url(&[self.spreadsheet_id.as_str(), "values", target.as_str()])
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T> {
        let _timer = STORE_CALL_DURATION
            .with_label_values(&[STORE_NAME, operation])
            .start_timer();

        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| Error::store(operation, e))?;

        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::store(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store {
                operation,
                message: format!("Sheets API returned {}: {}", status, body),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::store(operation, e))
    }

    async fn batch_update(
        &self,
        operation: &'static str,
        requests: Vec<Value>,
    ) -> Result<BatchUpdateResponse> {
        let url = self.spreadsheet_url(":batchUpdate")?;
        self.send(
            operation,
            self.http.post(url).json(&json!({ "requests": requests })),
        )
        .await
    }
}

/// `repeatCell` request body for one format request
fn repeat_cell(partition_id: i64, request: &FormatRequest) -> Value {
    let CellStyle {
        background,
        bold,
        centered,
    } = request.style;

    let mut format = serde_json::Map::new();
    let mut fields = Vec::new();
    if let Some(color) = background {
        format.insert(
            "backgroundColor".to_string(),
            json!({ "red": color.red, "green": color.green, "blue": color.blue }),
        );
        fields.push("backgroundColor");
    }
    if bold {
        format.insert("textFormat".to_string(), json!({ "bold": true }));
        fields.push("textFormat.bold");
    }
    if centered {
        format.insert("horizontalAlignment".to_string(), json!("CENTER"));
        fields.push("horizontalAlignment");
    }

    let mask = match fields.as_slice() {
        [single] => format!("userEnteredFormat.{}", single),
        many => format!("userEnteredFormat({})", many.join(",")),
    };

    json!({
        "repeatCell": {
            "range": {
                "sheetId": partition_id,
                "startRowIndex": request.start_row,
                "endRowIndex": request.end_row,
                "startColumnIndex": request.start_column,
                "endColumnIndex": request.end_column,
            },
            "cell": { "userEnteredFormat": Value::Object(format) },
            "fields": mask,
        }
    })
}

fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl TabularStore for GoogleSheetsStore {
    fn name(&self) -> &str {
        STORE_NAME
    }

    async fn list_partitions(&self) -> Result<Vec<PartitionInfo>> {
        let mut url = self.spreadsheet_url("")?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title)");
        let spreadsheet: SpreadsheetResponse =
            self.send("list_partitions", self.http.get(url)).await?;
        Ok(spreadsheet
            .sheets
            .into_iter()
            .map(|s| s.properties.into())
            .collect())
    }

    async fn create_partition(&self, title: &str) -> Result<PartitionInfo> {
        let response = self
            .batch_update(
                "create_partition",
                vec![json!({ "addSheet": { "properties": { "title": title } } })],
            )
            .await?;
        response
            .replies
            .into_iter()
            .find_map(|reply| reply.add_sheet)
            .map(|entry| entry.properties.into())
            .ok_or_else(|| Error::Store {
                operation: "create_partition",
                message: "addSheet reply missing from batchUpdate response".to_string(),
            })
    }

    async fn read_range(&self, partition: &str, range: &A1Range) -> Result<Vec<Row>> {
        let url = self.values_url(partition, range, "")?;
        let values: ValueRangeResponse = self.send("read_range", self.http.get(url)).await?;
        debug!(partition, range = %range, rows = values.values.len(), "Read range");
        Ok(values
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn append_rows(
        &self,
        partition: &str,
        range: &A1Range,
        rows: Vec<Row>,
    ) -> Result<AppendOutcome> {
        let mut url = self.values_url(partition, range, ":append")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");
        let response: AppendResponse = self
            .send(
                "append_rows",
                self.http.post(url).json(&json!({ "values": rows })),
            )
            .await?;
        Ok(AppendOutcome {
            updated_range: response.updates.updated_range,
        })
    }

    async fn batch_format(&self, partition_id: i64, requests: &[FormatRequest]) -> Result<()> {
        if requests.is_empty() {
            return Ok(());
        }
        let body = requests
            .iter()
            .map(|r| repeat_cell(partition_id, r))
            .collect();
        self.batch_update("batch_format", body).await?;
        Ok(())
    }
}
