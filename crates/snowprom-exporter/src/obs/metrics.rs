//! Labeled counters backed by `DashMap`, plus the scrape-level metric set.
//!
//! Keys are label values in descriptor order. Output is produced as
//! [`MetricFamily`] values so it goes through the same exposition code as
//! collected metrics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use snowprom_core::error::Result;
use snowprom_core::metric::{MetricDesc, MetricFamily, Sample, ValueType};

pub struct CounterVec {
    desc: Arc<MetricDesc>,
    map: DashMap<Vec<String>, AtomicU64>,
}

impl CounterVec {
    pub fn new(desc: MetricDesc) -> Self {
        Self {
            desc: Arc::new(desc),
            map: DashMap::new(),
        }
    }

    /// Increment by 1. Label values must follow the descriptor's label order.
    pub fn inc(&self, labels: &[&str]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[&str], v: u64) {
        debug_assert_eq!(labels.len(), self.desc.label_names().len());
        let key: Vec<String> = labels.iter().map(|v| v.to_string()).collect();
        let counter = self.map.entry(key).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[&str]) -> u64 {
        let key: Vec<String> = labels.iter().map(|v| v.to_string()).collect();
        self.map.get(&key).map(|c| c.load(Ordering::Relaxed)).unwrap_or(0)
    }

    fn family(&self) -> MetricFamily {
        let mut fam = MetricFamily::new(Arc::clone(&self.desc), ValueType::Counter);
        for r in self.map.iter() {
            fam.samples.push(Sample {
                labels: r.key().clone(),
                value: r.value().load(Ordering::Relaxed) as f64,
            });
        }
        fam.sort_samples();
        fam
    }
}

pub struct ScrapeMetrics {
    pub scrapes: CounterVec,
    pub query_errors: CounterVec,
    pub row_decode_errors: CounterVec,
    last_duration_desc: Arc<MetricDesc>,
    last_duration_micros: AtomicU64,
}

impl ScrapeMetrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            scrapes: CounterVec::new(MetricDesc::new(
                "snowprom_scrapes_total",
                "Scrapes served by the exporter",
                &[],
            )?),
            query_errors: CounterVec::new(MetricDesc::new(
                "snowprom_query_errors_total",
                "Warehouse queries that failed during a scrape",
                &["query"],
            )?),
            row_decode_errors: CounterVec::new(MetricDesc::new(
                "snowprom_row_decode_errors_total",
                "Result rows skipped because they could not be decoded",
                &["query"],
            )?),
            last_duration_desc: Arc::new(MetricDesc::new(
                "snowprom_last_scrape_duration_seconds",
                "Wall time of the most recent scrape",
                &[],
            )?),
            last_duration_micros: AtomicU64::new(0),
        })
    }

    pub fn query_error(&self, query: &str) {
        self.query_errors.inc(&[query]);
    }

    pub fn row_decode_error(&self, query: &str) {
        self.row_decode_errors.inc(&[query]);
    }

    /// Record a finished scrape.
    pub fn observe_scrape(&self, elapsed: Duration) {
        self.scrapes.inc(&[]);
        self.last_duration_micros
            .store(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// Families with at least one sample.
    pub fn families(&self) -> Vec<MetricFamily> {
        let mut out: Vec<MetricFamily> = [&self.scrapes, &self.query_errors, &self.row_decode_errors]
            .into_iter()
            .map(CounterVec::family)
            .filter(|f| !f.samples.is_empty())
            .collect();

        if self.scrapes.get(&[]) > 0 {
            let mut fam = MetricFamily::new(Arc::clone(&self.last_duration_desc), ValueType::Gauge);
            fam.samples.push(Sample {
                labels: vec![],
                value: self.last_duration_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0,
            });
            out.push(fam);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowprom_core::expo;

    #[test]
    fn counts_and_renders() {
        let m = ScrapeMetrics::new().unwrap();
        assert!(m.families().is_empty());

        m.query_error("storage_bytes");
        m.query_error("storage_bytes");
        m.row_decode_error("warehouse_credits");
        m.observe_scrape(Duration::from_millis(1500));

        assert_eq!(m.query_errors.get(&["storage_bytes"]), 2);
        let text = expo::render(&m.families());
        assert!(text.contains("# TYPE snowprom_query_errors_total counter\n"));
        assert!(text.contains("snowprom_query_errors_total{query=\"storage_bytes\"} 2\n"));
        assert!(text.contains("snowprom_row_decode_errors_total{query=\"warehouse_credits\"} 1\n"));
        assert!(text.contains("snowprom_scrapes_total 1\n"));
        assert!(text.contains("snowprom_last_scrape_duration_seconds 1.5\n"));
    }
}
