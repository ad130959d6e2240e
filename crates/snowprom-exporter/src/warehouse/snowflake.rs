//! Snowflake SQL API (v2) client.
//!
//! - `POST /api/v2/statements` submits a statement
//! - `202 Accepted` means still running: poll the statement handle
//! - results arrive in partitions; partition 0 comes with the first
//!   response, the rest are fetched lazily as the row stream is consumed
//!
//! No connection is opened at construction time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use snowprom_core::error::{Result, SnowpromError};

use super::{Dsn, Row, RowStream, Warehouse};

const STATEMENTS_PATH: &str = "/api/v2/statements";
const TOKEN_TYPE_HEADER: &str = "X-Snowflake-Authorization-Token-Type";
const POLL_INTERVAL: Duration = Duration::from_millis(500);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Extra time allowed past the statement timeout before polling gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    database: &'a str,
    schema: &'a str,
    warehouse: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    statement_handle: Option<String>,
    #[serde(default)]
    result_set_meta_data: Option<ResultSetMetaData>,
    #[serde(default)]
    data: Vec<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetaData {
    #[serde(default)]
    partition_info: Vec<PartitionInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartitionInfo {
    #[serde(default)]
    row_count: u64,
}

/// Cells are JSON strings or null; anything else is kept in its JSON form.
fn to_rows(data: Vec<Vec<Value>>) -> Vec<Row> {
    data.into_iter()
        .map(|cells| {
            Row::new(
                cells
                    .into_iter()
                    .map(|v| match v {
                        Value::Null => None,
                        Value::String(s) => Some(s),
                        other => Some(other.to_string()),
                    })
                    .collect(),
            )
        })
        .collect()
}

struct Inner {
    client: Client,
    dsn: Dsn,
}

/// Warehouse handle backed by the Snowflake SQL API.
#[derive(Clone)]
pub struct SnowflakeWarehouse {
    inner: Arc<Inner>,
}

impl SnowflakeWarehouse {
    /// Build the HTTP client. Does not contact the warehouse.
    pub fn connect(dsn: Dsn) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("snowprom/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| SnowpromError::Connection(format!("http client build failed: {e}")))?;
        Ok(Self {
            inner: Arc::new(Inner { client, dsn }),
        })
    }

}

impl Inner {
    fn statements_url(&self) -> String {
        format!("{}{}", self.dsn.endpoint, STATEMENTS_PATH)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.bearer_auth(&self.dsn.token)
            .header(TOKEN_TYPE_HEADER, &self.dsn.token_type)
            .header(header::ACCEPT, "application/json")
    }

    async fn submit(&self, sql: &str) -> Result<StatementResponse> {
        let body = StatementRequest {
            statement: sql,
            timeout: self.dsn.timeout_secs,
            database: &self.dsn.database,
            schema: &self.dsn.schema,
            warehouse: &self.dsn.warehouse,
            role: self.dsn.role.as_deref(),
        };
        let resp = self
            .authed(self.client.post(self.statements_url()))
            .json(&body)
            .send()
            .await
            .map_err(|e| SnowpromError::Query(format!("submit failed: {e}")))?;

        let (status, parsed) = read_response(resp).await?;
        if status == StatusCode::ACCEPTED {
            let handle = parsed
                .statement_handle
                .ok_or_else(|| SnowpromError::Query("202 without statementHandle".into()))?;
            // Poll responses may omit the handle; later partitions still need it.
            let mut done = self.wait_for(&handle).await?;
            done.statement_handle.get_or_insert(handle);
            return Ok(done);
        }
        Ok(parsed)
    }

    async fn wait_for(&self, handle: &str) -> Result<StatementResponse> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(self.dsn.timeout_secs) + POLL_GRACE;
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let resp = self
                .authed(self.client.get(format!("{}/{}", self.statements_url(), handle)))
                .send()
                .await
                .map_err(|e| SnowpromError::Query(format!("status poll failed: {e}")))?;
            let (status, parsed) = read_response(resp).await?;
            if status != StatusCode::ACCEPTED {
                return Ok(parsed);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(SnowpromError::Query(format!(
                    "statement {handle} still running after {}s",
                    self.dsn.timeout_secs
                )));
            }
            tracing::debug!(handle = %handle, "statement still running");
        }
    }

    async fn fetch_partition(&self, handle: &str, partition: usize) -> Result<Vec<Row>> {
        let resp = self
            .authed(self.client.get(format!("{}/{}", self.statements_url(), handle)))
            .query(&[("partition", partition)])
            .send()
            .await
            .map_err(|e| SnowpromError::Query(format!("partition {partition} fetch failed: {e}")))?;
        let (_, parsed) = read_response(resp).await?;
        Ok(to_rows(parsed.data))
    }
}

/// Map non-2xx to `Query` errors carrying the server's code and message.
async fn read_response(resp: Response) -> Result<(StatusCode, StatementResponse)> {
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| SnowpromError::Query(format!("reading response failed: {e}")))?;

    if !status.is_success() {
        let detail = match serde_json::from_str::<StatementResponse>(&text) {
            Ok(StatementResponse {
                code: Some(code),
                message,
                ..
            }) => format!("{code}: {}", message.unwrap_or_default()),
            _ => text.chars().take(256).collect(),
        };
        return Err(SnowpromError::Query(format!("http {}: {detail}", status.as_u16())));
    }

    let parsed = serde_json::from_str::<StatementResponse>(&text)
        .map_err(|e| SnowpromError::Query(format!("invalid response body: {e}")))?;
    Ok((status, parsed))
}

#[async_trait]
impl Warehouse for SnowflakeWarehouse {
    async fn query(&self, sql: &str) -> Result<RowStream> {
        let first = self.inner.submit(sql).await?;

        let (partitions, total_rows) = first
            .result_set_meta_data
            .as_ref()
            .map(|m| {
                let rows: u64 = m.partition_info.iter().map(|p| p.row_count).sum();
                (m.partition_info.len(), rows)
            })
            .unwrap_or((0, 0));
        let handle = first.statement_handle.clone();
        tracing::debug!(handle = handle.as_deref().unwrap_or("-"), partitions, total_rows, "statement completed");

        let head = stream::iter(to_rows(first.data).into_iter().map(Ok::<Row, SnowpromError>));
        if partitions <= 1 {
            return Ok(head.boxed());
        }
        let handle = handle.ok_or_else(|| {
            SnowpromError::Query(format!("{partitions} partitions but no statementHandle"))
        })?;

        let inner = Arc::clone(&self.inner);
        let rest = stream::iter(1..partitions)
            .then(move |p| {
                let inner = Arc::clone(&inner);
                let handle = handle.clone();
                async move { inner.fetch_partition(&handle, p).await }
            })
            .map_ok(|rows| stream::iter(rows.into_iter().map(Ok::<Row, SnowpromError>)))
            .try_flatten();

        Ok(head.chain(rest).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_result_body() {
        let body = r#"{
            "resultSetMetaData": {
                "numRows": 3,
                "format": "jsonv2",
                "rowType": [{"name": "WAREHOUSE_NAME"}, {"name": "TOTAL_CREDITS"}],
                "partitionInfo": [{"rowCount": 2}, {"rowCount": 1}]
            },
            "data": [["COMPUTE_WH", "10.5"], ["REPORTING_WH", null]],
            "code": "090001",
            "statementHandle": "01a-b",
            "message": "Statement executed successfully."
        }"#;
        let r: StatementResponse = serde_json::from_str(body).unwrap();
        assert_eq!(r.statement_handle.as_deref(), Some("01a-b"));
        let meta = r.result_set_meta_data.as_ref().unwrap();
        assert_eq!(meta.partition_info.len(), 2);
        assert_eq!(meta.partition_info[0].row_count, 2);

        let rows = to_rows(r.data);
        assert_eq!(rows[0].text(0).unwrap(), "COMPUTE_WH");
        assert_eq!(rows[0].float(1).unwrap(), 10.5);
        assert!(rows[1].float(1).is_err());
    }

    #[test]
    fn non_string_cells_keep_json_form() {
        let rows = to_rows(vec![vec![Value::from(42), Value::Bool(true)]]);
        assert_eq!(rows[0].text(0).unwrap(), "42");
        assert_eq!(rows[0].text(1).unwrap(), "true");
    }

    #[test]
    fn request_body_omits_missing_role() {
        let body = StatementRequest {
            statement: "select 1",
            timeout: 60,
            database: "DB",
            schema: "SC",
            warehouse: "WH",
            role: None,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["statement"], "select 1");
        assert_eq!(v["timeout"], 60);
        assert!(v.get("role").is_none());
    }
}
