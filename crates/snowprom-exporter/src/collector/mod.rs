//! Scrape-time collectors.
//!
//! A collector declares a fixed catalog up front ([`Collector::describe`])
//! and pushes observations into a channel on every scrape
//! ([`Collector::collect`]). It never emits a descriptor it did not declare.

pub mod snowflake;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use snowprom_core::metric::{MetricDesc, Observation};

pub use snowflake::{Descriptors, MetricsCollector, QuerySpec, RowDecoder};

#[async_trait]
pub trait Collector: Send + Sync {
    /// Static catalog. Pure, callable before any collect.
    fn describe(&self) -> Vec<Arc<MetricDesc>>;

    /// Push this scrape's observations. Errors are handled inside; a closed
    /// channel means the scrape was abandoned and collection should stop.
    async fn collect(&self, out: &mpsc::Sender<Observation>);
}
