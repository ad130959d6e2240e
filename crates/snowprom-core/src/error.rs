//! Shared error type across snowprom crates.

use thiserror::Error;

/// Stable error classes, used as log fields and metric label values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Warehouse handle could not be created.
    Connection,
    /// A statement failed at execution or fetch time.
    Query,
    /// A single result row could not be decoded.
    RowDecode,
    /// Invalid configuration.
    Config,
    /// Invalid metric descriptor or observation.
    Metric,
    /// Anything else.
    Internal,
}

impl ErrorClass {
    /// String representation used in logs and labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Connection => "connection",
            ErrorClass::Query => "query",
            ErrorClass::RowDecode => "row_decode",
            ErrorClass::Config => "config",
            ErrorClass::Metric => "metric",
            ErrorClass::Internal => "internal",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SnowpromError>;

/// Unified error type used by core and exporter.
#[derive(Debug, Error)]
pub enum SnowpromError {
    #[error("connection: {0}")]
    Connection(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("row decode: {0}")]
    RowDecode(String),
    #[error("config: {0}")]
    Config(String),
    #[error("metric: {0}")]
    Metric(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl SnowpromError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SnowpromError::Connection(_) => ErrorClass::Connection,
            SnowpromError::Query(_) => ErrorClass::Query,
            SnowpromError::RowDecode(_) => ErrorClass::RowDecode,
            SnowpromError::Config(_) => ErrorClass::Config,
            SnowpromError::Metric(_) => ErrorClass::Metric,
            SnowpromError::Internal(_) => ErrorClass::Internal,
        }
    }
}
