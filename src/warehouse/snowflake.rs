//! Snowflake warehouse backend
//!
//! Speaks Snowflake's session REST endpoints over reqwest:
//!
//! ```text
//! connect: POST /session/v1/login-request   (user/password → session token)
//! query:   POST /queries/v1/query-request   (sqlText + positional bindings)
//!          GET  <getResultUrl>              (polled while the query is still running)
//!          GET  <chunk url>                 (only for results split into chunks)
//! ```
//!
//! Results are requested in JSON form; every cell arrives as a string (or
//! null) and is decoded using the column's `rowtype` metadata.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::error::{WarehouseError, WarehouseResult};
use super::types::{RowSet, Value};
use super::Warehouse;
use crate::config::WarehouseConfig;

const CLIENT_APP_ID: &str = "pandemic-dashboard";

/// Response codes for a query that has not finished yet
const QUERY_IN_PROGRESS: [&str; 2] = ["333333", "333334"];

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Connection parameters after the presence check
#[derive(Debug, Clone)]
pub struct SnowflakeCredentials {
    pub user: String,
    pub password: String,
    pub account: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
}

impl SnowflakeCredentials {
    /// Presence check only; anything set is passed through untouched
    pub fn from_config(config: &WarehouseConfig) -> WarehouseResult<Self> {
        fn require(value: &Option<String>, var: &str) -> WarehouseResult<String> {
            value
                .clone()
                .ok_or_else(|| WarehouseError::Connection(format!("{} is not set", var)))
        }

        Ok(Self {
            user: require(&config.user, "SNOWFLAKE_USER")?,
            password: require(&config.password, "SNOWFLAKE_PASSWORD")?,
            account: require(&config.account, "SNOWFLAKE_ACCOUNT")?,
            warehouse: require(&config.warehouse, "SNOWFLAKE_WAREHOUSE")?,
            database: require(&config.database, "SNOWFLAKE_DATABASE")?,
            schema: require(&config.schema, "SNOWFLAKE_SCHEMA")?,
        })
    }

    fn base_url(&self) -> String {
        format!("https://{}.snowflakecomputing.com", self.account)
    }
}

/// One authenticated Snowflake session, held for the process lifetime
pub struct SnowflakeWarehouse {
    client: Client,
    base_url: String,
    token: String,
    label: String,
    sequence: AtomicU64,
    /// Upper bound on waiting for a running query's result
    result_timeout: Duration,
}

impl SnowflakeWarehouse {
    /// Log in and open a session
    pub async fn connect(config: &WarehouseConfig) -> WarehouseResult<Self> {
        let creds = SnowflakeCredentials::from_config(config)?;
        let base_url = creds.base_url();

        let timeout = Duration::from_secs(config.request_timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WarehouseError::Connection(e.to_string()))?;

        let url = format!(
            "{}/session/v1/login-request?warehouse={}&databaseName={}&schemaName={}&request_id={}",
            base_url,
            urlencoding::encode(&creds.warehouse),
            urlencoding::encode(&creds.database),
            urlencoding::encode(&creds.schema),
            uuid::Uuid::new_v4(),
        );

        let mut session_parameters = HashMap::new();
        session_parameters.insert(
            "PYTHON_CONNECTOR_QUERY_RESULT_FORMAT".to_string(),
            JsonValue::String("JSON".to_string()),
        );

        let body = LoginRequest {
            data: LoginData {
                client_app_id: CLIENT_APP_ID.to_string(),
                client_app_version: env!("CARGO_PKG_VERSION").to_string(),
                account_name: creds.account.clone(),
                login_name: creds.user.clone(),
                password: creds.password.clone(),
                session_parameters,
            },
        };

        tracing::info!(account = %creds.account, user = %creds.user, "Connecting to Snowflake");

        let response = client
            .post(&url)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| WarehouseError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(WarehouseError::Connection(format!(
                "login failed ({}): {}",
                status, text
            )));
        }

        let envelope: Envelope<LoginResponseData> = response
            .json()
            .await
            .map_err(|e| WarehouseError::Connection(e.to_string()))?;

        let data = envelope
            .into_data()
            .map_err(|msg| WarehouseError::Connection(format!("login rejected: {}", msg)))?;

        tracing::info!(account = %creds.account, "Snowflake session established");

        Ok(Self {
            client,
            base_url,
            token: data.token,
            label: format!("snowflake:{}", creds.account),
            sequence: AtomicU64::new(0),
            result_timeout: timeout,
        })
    }

    fn auth_header(&self) -> String {
        format!("Snowflake Token=\"{}\"", self.token)
    }

    /// Status check and envelope decoding shared by submit and poll
    async fn read_reply(response: reqwest::Response) -> WarehouseResult<QueryReply> {
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(WarehouseError::Query(format!("{}: {}", status, text)));
        }

        let envelope: Envelope<QueryResponseData> = response.json().await?;
        envelope.into_reply().map_err(WarehouseError::Query)
    }

    /// Poll `getResultUrl` with backoff until the query finishes
    async fn await_result(&self, mut reply: QueryReply) -> WarehouseResult<QueryResponseData> {
        let deadline = tokio::time::Instant::now() + self.result_timeout;
        let mut delay = POLL_INTERVAL;

        loop {
            let path = match reply {
                QueryReply::Ready(data) => return Ok(data),
                QueryReply::Pending(path) => path,
            };

            if tokio::time::Instant::now() + delay > deadline {
                return Err(WarehouseError::Query(format!(
                    "query still running after {}s",
                    self.result_timeout.as_secs()
                )));
            }
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(MAX_POLL_INTERVAL);

            tracing::debug!(path = %path, "Polling for query result");

            let response = self
                .client
                .get(result_url(&self.base_url, &path))
                .header("Authorization", self.auth_header())
                .header("Accept", "application/snowflake")
                .send()
                .await?;
            reply = Self::read_reply(response).await?;
        }
    }

    async fn fetch_chunk(
        &self,
        chunk: &ChunkRef,
        headers: &HashMap<String, String>,
        rowtype: &[ColumnType],
    ) -> WarehouseResult<Vec<Vec<Value>>> {
        let mut request = self.client.get(&chunk.url);
        for (k, v) in headers {
            request = request.header(k.as_str(), v.as_str());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(WarehouseError::Query(format!(
                "chunk download failed: {}",
                response.status()
            )));
        }

        // JSON chunks are a comma-separated row list without the outer brackets
        let text = response.text().await?;
        let raw: Vec<Vec<Option<String>>> = serde_json::from_str(&format!("[{}]", text))?;
        decode_rows(raw, rowtype)
    }
}

#[async_trait]
impl Warehouse for SnowflakeWarehouse {
    fn name(&self) -> &str {
        &self.label
    }

    async fn query(&self, sql: &str, params: &[Value]) -> WarehouseResult<RowSet> {
        let sequence_id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let url = format!(
            "{}/queries/v1/query-request?requestId={}",
            self.base_url,
            uuid::Uuid::new_v4()
        );

        let body = QueryRequest {
            sql_text: sql.to_string(),
            async_exec: false,
            sequence_id,
            bindings: bindings(params),
        };

        tracing::debug!(sequence_id, sql = %sql, "Running Snowflake query");

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/snowflake")
            .json(&body)
            .send()
            .await?;

        let reply = Self::read_reply(response).await?;
        let data = self.await_result(reply).await?;

        let columns = data.rowtype.iter().map(|c| c.name.clone()).collect();

        let Some(rowset) = data.rowset else {
            return Err(WarehouseError::Decode(
                "warehouse returned a non-JSON result format".to_string(),
            ));
        };

        let mut rows = decode_rows(rowset, &data.rowtype)?;
        for chunk in &data.chunks {
            rows.extend(self.fetch_chunk(chunk, &data.chunk_headers, &data.rowtype).await?);
        }

        Ok(RowSet::new(columns, rows))
    }
}

/// `getResultUrl` is usually a path relative to the account host
fn result_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{}{}", base_url, path)
    }
}

fn bindings(params: &[Value]) -> HashMap<String, Binding> {
    params
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let (kind, value) = match value {
                Value::Null => ("ANY", None),
                Value::Int(v) => ("FIXED", Some(v.to_string())),
                Value::Float(v) => ("REAL", Some(v.to_string())),
                Value::Date(d) => ("TEXT", Some(d.format("%Y-%m-%d").to_string())),
                Value::Text(s) => ("TEXT", Some(s.clone())),
            };
            (
                (i + 1).to_string(),
                Binding {
                    kind: kind.to_string(),
                    value,
                },
            )
        })
        .collect()
}

fn decode_rows(
    raw: Vec<Vec<Option<String>>>,
    rowtype: &[ColumnType],
) -> WarehouseResult<Vec<Vec<Value>>> {
    raw.into_iter()
        .map(|row| -> WarehouseResult<Vec<Value>> {
            if row.len() != rowtype.len() {
                return Err(WarehouseError::Decode(format!(
                    "row has {} cells, expected {}",
                    row.len(),
                    rowtype.len()
                )));
            }
            row.into_iter()
                .zip(rowtype)
                .map(|(cell, column)| decode_cell(cell, column))
                .collect()
        })
        .collect()
}

fn decode_cell(cell: Option<String>, column: &ColumnType) -> WarehouseResult<Value> {
    let Some(text) = cell else {
        return Ok(Value::Null);
    };

    let bad = || {
        WarehouseError::Decode(format!(
            "cannot decode {:?} as {} in column {}",
            text, column.kind, column.name
        ))
    };

    match column.kind.to_ascii_lowercase().as_str() {
        "fixed" if column.scale.unwrap_or(0) == 0 => {
            text.parse::<i64>().map(Value::Int).map_err(|_| bad())
        }
        "fixed" | "real" => text.parse::<f64>().map(Value::Float).map_err(|_| bad()),
        "date" => {
            let days: i64 = text.parse().map_err(|_| bad())?;
            NaiveDate::from_ymd_opt(1970, 1, 1)
                .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days)))
                .map(Value::Date)
                .ok_or_else(bad)
        }
        _ => Ok(Value::Text(text)),
    }
}

// ============================================
// Request/Response DTOs
// ============================================

#[derive(Debug, Serialize)]
struct LoginRequest {
    data: LoginData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct LoginData {
    client_app_id: String,
    client_app_version: String,
    account_name: String,
    login_name: String,
    password: String,
    session_parameters: HashMap<String, JsonValue>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(format!(
                "{} (code {})",
                self.message.unwrap_or_else(|| "unknown error".to_string()),
                self.code.unwrap_or_else(|| "-".to_string())
            )),
        }
    }
}

/// Outcome of a query submit or poll
#[derive(Debug)]
enum QueryReply {
    Ready(QueryResponseData),
    /// Still running; poll this result path
    Pending(String),
}

impl Envelope<QueryResponseData> {
    fn into_reply(self) -> Result<QueryReply, String> {
        let running = self
            .code
            .as_deref()
            .is_some_and(|code| QUERY_IN_PROGRESS.contains(&code));
        let result_path = self.data.as_ref().and_then(|d| d.get_result_url.clone());

        match (running, result_path) {
            (true, Some(path)) => Ok(QueryReply::Pending(path)),
            _ => self.into_data().map(QueryReply::Ready),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponseData {
    token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    sql_text: String,
    async_exec: bool,
    sequence_id: u64,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    bindings: HashMap<String, Binding>,
}

#[derive(Debug, Serialize)]
struct Binding {
    #[serde(rename = "type")]
    kind: String,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponseData {
    #[serde(default)]
    rowtype: Vec<ColumnType>,
    #[serde(default)]
    rowset: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    chunks: Vec<ChunkRef>,
    #[serde(default)]
    chunk_headers: HashMap<String, String>,
    #[serde(default)]
    get_result_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ColumnType {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    scale: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChunkRef {
    url: String,
}
