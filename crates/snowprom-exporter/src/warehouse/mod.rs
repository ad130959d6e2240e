//! Warehouse connection abstraction.
//!
//! The collector talks to the warehouse only through [`Warehouse`]. Results
//! come back as a lazily-fetched stream of [`Row`]s so a failure in a later
//! result page stops the remaining rows of that statement without
//! discarding the rows already seen.

pub mod dsn;
pub mod snowflake;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use snowprom_core::error::{Result, SnowpromError};

pub use dsn::Dsn;
pub use snowflake::SnowflakeWarehouse;

/// Stream of result rows. An `Err` item ends the statement.
pub type RowStream = BoxStream<'static, Result<Row>>;

/// Executes read-only statements against the warehouse.
#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn query(&self, sql: &str) -> Result<RowStream>;
}

/// One result row: ordered, nullable, text-encoded cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    cells: Vec<Option<String>>,
}

impl Row {
    pub fn new(cells: Vec<Option<String>>) -> Self {
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Non-null text cell at `idx`.
    pub fn text(&self, idx: usize) -> Result<&str> {
        match self.cells.get(idx) {
            Some(Some(v)) => Ok(v.as_str()),
            Some(None) => Err(SnowpromError::RowDecode(format!("column {idx} is null"))),
            None => Err(SnowpromError::RowDecode(format!(
                "column {idx} out of range (row has {} columns)",
                self.cells.len()
            ))),
        }
    }

    /// Non-null numeric cell at `idx`.
    pub fn float(&self, idx: usize) -> Result<f64> {
        let raw = self.text(idx)?;
        raw.trim()
            .parse::<f64>()
            .map_err(|e| SnowpromError::RowDecode(format!("column {idx} ({raw:?}) is not a number: {e}")))
    }
}

impl<S: Into<String>> From<Vec<Option<S>>> for Row {
    fn from(cells: Vec<Option<S>>) -> Self {
        Self::new(cells.into_iter().map(|c| c.map(Into::into)).collect())
    }
}
