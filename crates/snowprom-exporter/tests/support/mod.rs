#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;

use snowprom_core::error::{Result, SnowpromError};
use snowprom_core::metric::Observation;
use snowprom_exporter::collector::Collector;
use snowprom_exporter::warehouse::{Row, RowStream, Warehouse};

/// Scripted outcome of one statement.
#[derive(Clone)]
pub enum Reply {
    Rows(Vec<Row>),
    /// Rows, then a fetch failure.
    RowsThenError(Vec<Row>, String),
    Fail(String),
}

pub fn row(label: &str, value: &str) -> Row {
    Row::from(vec![Some(label), Some(value)])
}

/// In-memory warehouse keyed by exact SQL text. Records every statement it receives.
#[derive(Clone, Default)]
pub struct FakeWarehouse {
    replies: HashMap<String, Reply>,
    delay: Duration,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl FakeWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, sql: &str, reply: Reply) -> Self {
        self.replies.insert(sql.to_string(), reply);
        self
    }

    /// Sleep inside every query, to widen race windows.
    pub fn delay(mut self, d: Duration) -> Self {
        self.delay = d;
        self
    }
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn query(&self, sql: &str) -> Result<RowStream> {
        self.log.lock().unwrap().push(sql.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.replies.get(sql).cloned() {
            None => Err(SnowpromError::Query(format!("no such table for: {sql}"))),
            Some(Reply::Fail(msg)) => Err(SnowpromError::Query(msg)),
            Some(Reply::Rows(rows)) => Ok(stream::iter(rows.into_iter().map(Ok::<Row, SnowpromError>)).boxed()),
            Some(Reply::RowsThenError(rows, msg)) => {
                let items: Vec<Result<Row>> = rows
                    .into_iter()
                    .map(Ok::<Row, SnowpromError>)
                    .chain(std::iter::once(Err(SnowpromError::Query(msg))))
                    .collect();
                Ok(stream::iter(items).boxed())
            }
        }
    }
}

/// Run one collect to completion and return everything it pushed.
pub async fn collect_all(c: &dyn Collector) -> Vec<Observation> {
    let (tx, mut rx) = mpsc::channel(256);
    c.collect(&tx).await;
    drop(tx);
    let mut out = Vec::new();
    while let Some(o) = rx.recv().await {
        out.push(o);
    }
    out
}

/// (metric, labels, value) triples for easy assertions.
pub fn triples(obs: &[Observation]) -> Vec<(&str, Vec<&str>, f64)> {
    obs.iter()
        .map(|o| {
            let labels = o.labels().iter().map(String::as_str).collect();
            (o.desc().name(), labels, o.value())
        })
        .collect()
}
