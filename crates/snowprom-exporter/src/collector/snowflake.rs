//! Snowflake usage collector.
//!
//! Runs a fixed set of account-usage queries on every scrape and turns each
//! result row into a gauge observation.
//!
//! Failure policy:
//! - a failed query is logged and skipped, the next query still runs
//! - a row that cannot be decoded is logged and skipped, the next row still runs
//! - neither is reported to the scrape caller
//!
//! One mutex guards the warehouse handle for the whole query sequence, so
//! concurrent scrapes run one after another.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::{mpsc, Mutex};

use snowprom_core::error::{Result, SnowpromError};
use snowprom_core::metric::{MetricDesc, Observation};

use crate::collector::Collector;
use crate::obs::metrics::ScrapeMetrics;
use crate::warehouse::{Dsn, Row, SnowflakeWarehouse, Warehouse};

pub const WAREHOUSE_CREDITS_SQL: &str = "\
SELECT warehouse_name, SUM(credits_used) AS total_credits \
FROM snowflake.account_usage.warehouse_metering_history \
WHERE start_time > DATEADD(day, -1, CURRENT_TIMESTAMP()) \
GROUP BY warehouse_name";

pub const STORAGE_BYTES_SQL: &str = "\
SELECT database_name, storage_bytes \
FROM snowflake.account_usage.database_storage_usage_history \
WHERE usage_date = CURRENT_DATE()";

/// Turns one result row into (label values, value).
pub type RowDecoder = fn(&Row) -> Result<(Vec<String>, f64)>;

/// A fixed statement, the descriptor it feeds, and its row decoder.
#[derive(Clone)]
pub struct QuerySpec {
    pub name: &'static str,
    pub sql: String,
    pub desc: Arc<MetricDesc>,
    pub decode: RowDecoder,
}

impl QuerySpec {
    pub fn new(name: &'static str, sql: impl Into<String>, desc: Arc<MetricDesc>, decode: RowDecoder) -> Self {
        Self {
            name,
            sql: sql.into(),
            desc,
            decode,
        }
    }
}

/// `(label, value)` rows: column 0 is the single label, column 1 the value.
pub fn decode_label_value(row: &Row) -> Result<(Vec<String>, f64)> {
    if row.len() != 2 {
        return Err(SnowpromError::RowDecode(format!("expected 2 columns, got {}", row.len())));
    }
    let label = row.text(0)?.to_string();
    let value = row.float(1)?;
    Ok((vec![label], value))
}

/// The metric catalog advertised by [`MetricsCollector`].
///
/// `query_count` and `concurrent_queries` are reserved: they are described
/// but no query feeds them yet.
#[derive(Debug, Clone)]
pub struct Descriptors {
    pub warehouse_credits: Arc<MetricDesc>,
    pub storage_bytes: Arc<MetricDesc>,
    pub query_count: Arc<MetricDesc>,
    pub concurrent_queries: Arc<MetricDesc>,
}

impl Descriptors {
    pub fn new() -> Result<Self> {
        Ok(Self {
            warehouse_credits: Arc::new(MetricDesc::new(
                "snowflake_warehouse_credits_used",
                "Number of credits used by warehouse",
                &["warehouse_name"],
            )?),
            storage_bytes: Arc::new(MetricDesc::new(
                "snowflake_storage_bytes",
                "Total storage used in bytes",
                &["database_name"],
            )?),
            query_count: Arc::new(MetricDesc::new(
                "snowflake_query_count",
                "Number of queries executed",
                &["warehouse_name", "query_type"],
            )?),
            concurrent_queries: Arc::new(MetricDesc::new(
                "snowflake_concurrent_queries",
                "Number of concurrent queries",
                &["warehouse_name"],
            )?),
        })
    }

    pub fn all(&self) -> Vec<Arc<MetricDesc>> {
        vec![
            Arc::clone(&self.warehouse_credits),
            Arc::clone(&self.storage_bytes),
            Arc::clone(&self.query_count),
            Arc::clone(&self.concurrent_queries),
        ]
    }

    /// Queries backing the non-reserved descriptors.
    pub fn default_queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new(
                "warehouse_credits",
                WAREHOUSE_CREDITS_SQL,
                Arc::clone(&self.warehouse_credits),
                decode_label_value,
            ),
            QuerySpec::new(
                "storage_bytes",
                STORAGE_BYTES_SQL,
                Arc::clone(&self.storage_bytes),
                decode_label_value,
            ),
        ]
    }
}

pub struct MetricsCollector {
    warehouse: Mutex<Box<dyn Warehouse>>,
    catalog: Vec<Arc<MetricDesc>>,
    queries: Vec<QuerySpec>,
    scrape_metrics: Option<Arc<ScrapeMetrics>>,
}

impl MetricsCollector {
    /// Build from a connection string with the standard catalog and queries.
    /// Fails on a malformed DSN; does not contact the warehouse.
    pub fn connect(dsn: &str) -> Result<Self> {
        let dsn = Dsn::parse(dsn)?;
        tracing::info!(
            account = %dsn.account,
            warehouse = %dsn.warehouse,
            endpoint = %dsn.endpoint,
            "snowflake handle created"
        );
        let warehouse = SnowflakeWarehouse::connect(dsn)?;
        let descs = Descriptors::new()?;
        let queries = descs.default_queries();
        Self::new(Box::new(warehouse), descs.all(), queries)
    }

    /// Every query's descriptor must be part of `catalog`.
    pub fn new(warehouse: Box<dyn Warehouse>, catalog: Vec<Arc<MetricDesc>>, queries: Vec<QuerySpec>) -> Result<Self> {
        for q in &queries {
            if !catalog.iter().any(|d| **d == *q.desc) {
                return Err(SnowpromError::Metric(format!(
                    "query {} feeds undeclared metric {}",
                    q.name,
                    q.desc.name()
                )));
            }
        }
        Ok(Self {
            warehouse: Mutex::new(warehouse),
            catalog,
            queries,
            scrape_metrics: None,
        })
    }

    /// Count query and row failures into exporter self-metrics.
    pub fn with_scrape_metrics(mut self, metrics: Arc<ScrapeMetrics>) -> Self {
        self.scrape_metrics = Some(metrics);
        self
    }

    /// Returns false once the receiver is gone.
    async fn run_query(&self, warehouse: &dyn Warehouse, q: &QuerySpec, out: &mpsc::Sender<Observation>) -> bool {
        let mut rows = match warehouse.query(&q.sql).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(query = %q.name, error = %e, "query failed; skipping for this scrape");
                if let Some(m) = &self.scrape_metrics {
                    m.query_error(q.name);
                }
                return true;
            }
        };

        let mut emitted = 0usize;
        while let Some(item) = rows.next().await {
            let row = match item {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!(query = %q.name, error = %e, emitted, "result fetch failed; dropping remaining rows");
                    if let Some(m) = &self.scrape_metrics {
                        m.query_error(q.name);
                    }
                    break;
                }
            };

            let obs = (q.decode)(&row)
                .and_then(|(labels, value)| Observation::gauge(Arc::clone(&q.desc), value, labels));
            let obs = match obs {
                Ok(obs) => obs,
                Err(e) => {
                    tracing::warn!(query = %q.name, error = %e, "skipping undecodable row");
                    if let Some(m) = &self.scrape_metrics {
                        m.row_decode_error(q.name);
                    }
                    continue;
                }
            };

            if out.send(obs).await.is_err() {
                return false;
            }
            emitted += 1;
        }

        tracing::debug!(query = %q.name, emitted, "query collected");
        true
    }
}

#[async_trait]
impl Collector for MetricsCollector {
    fn describe(&self) -> Vec<Arc<MetricDesc>> {
        self.catalog.clone()
    }

    async fn collect(&self, out: &mpsc::Sender<Observation>) {
        let warehouse = self.warehouse.lock().await;
        for q in &self.queries {
            if !self.run_query(&**warehouse, q, out).await {
                tracing::debug!(query = %q.name, "scrape abandoned by receiver");
                return;
            }
        }
    }
}
