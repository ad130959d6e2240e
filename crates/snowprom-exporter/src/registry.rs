//! Collector registry.
//!
//! Owned by the application state rather than global. Collectors are
//! described once at registration; every gather checks observations against
//! that catalog and groups them into families in catalog order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use snowprom_core::error::{Result, SnowpromError};
use snowprom_core::metric::{MetricDesc, MetricFamily, Observation, Sample};

use crate::collector::Collector;

/// Observations buffered between a collector and the gathering side.
const OBSERVATION_BUFFER: usize = 64;

struct Registered {
    collector: Arc<dyn Collector>,
    catalog: Vec<Arc<MetricDesc>>,
}

#[derive(Default)]
pub struct Registry {
    collectors: Vec<Registered>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects metric names already declared by another collector.
    pub fn register(&mut self, collector: Arc<dyn Collector>) -> Result<()> {
        let catalog = collector.describe();
        for (i, d) in catalog.iter().enumerate() {
            let clash = self
                .collectors
                .iter()
                .flat_map(|r| r.catalog.iter())
                .chain(&catalog[..i])
                .any(|x| x.name() == d.name());
            if clash {
                return Err(SnowpromError::Metric(format!(
                    "duplicate metric registration: {}",
                    d.name()
                )));
            }
        }
        tracing::debug!(metrics = catalog.len(), "collector registered");
        self.collectors.push(Registered { collector, catalog });
        Ok(())
    }

    /// Every declared descriptor, in registration order.
    pub fn describe(&self) -> Vec<Arc<MetricDesc>> {
        self.collectors
            .iter()
            .flat_map(|r| r.catalog.iter().cloned())
            .collect()
    }

    /// Run every collector and group the observations.
    ///
    /// With a deadline, a collector still running when it expires is
    /// dropped (releasing its lock) and whatever it already pushed is kept.
    pub async fn gather(&self, deadline: Option<Duration>) -> Vec<MetricFamily> {
        let until = deadline.map(|d| Instant::now() + d);
        let mut families = Vec::new();

        for reg in &self.collectors {
            let budget = until.map(|u| u.saturating_duration_since(Instant::now()));
            if budget == Some(Duration::ZERO) {
                tracing::warn!("scrape deadline reached; skipping remaining collectors");
                break;
            }

            let mut acc = FamilyAccumulator::new(&reg.catalog);
            if !drain(reg.collector.as_ref(), &mut acc, budget).await {
                tracing::warn!(
                    received = acc.received,
                    "scrape deadline reached; returning partial results"
                );
            }
            families.extend(acc.finish());
        }
        families
    }
}

/// Returns false if the budget ran out before the collector finished.
async fn drain(collector: &dyn Collector, acc: &mut FamilyAccumulator, budget: Option<Duration>) -> bool {
    let (tx, mut rx) = mpsc::channel(OBSERVATION_BUFFER);

    // `tx` is dropped when collect returns, which ends the receive loop.
    let produce = async move {
        collector.collect(&tx).await;
    };
    let consume = async {
        while let Some(obs) = rx.recv().await {
            acc.push(obs);
        }
    };
    let both = async {
        tokio::join!(produce, consume);
    };

    match budget {
        Some(b) => tokio::time::timeout(b, both).await.is_ok(),
        None => {
            both.await;
            true
        }
    }
}

struct FamilyAccumulator {
    families: Vec<MetricFamily>,
    received: usize,
}

impl FamilyAccumulator {
    fn new(catalog: &[Arc<MetricDesc>]) -> Self {
        Self {
            families: catalog
                .iter()
                .map(|d| MetricFamily::new(Arc::clone(d), snowprom_core::ValueType::Gauge))
                .collect(),
            received: 0,
        }
    }

    fn push(&mut self, obs: Observation) {
        self.received += 1;
        let Some(fam) = self
            .families
            .iter_mut()
            .find(|f| f.desc.name() == obs.desc().name())
        else {
            tracing::warn!(metric = %obs.desc().name(), "dropping observation of undeclared metric");
            return;
        };
        if *fam.desc != **obs.desc() {
            tracing::warn!(metric = %obs.desc().name(), "dropping observation with mismatched descriptor");
            return;
        }
        if fam.samples.iter().any(|s| s.labels == obs.labels()) {
            tracing::warn!(metric = %obs.desc().name(), labels = ?obs.labels(), "dropping duplicate sample");
            return;
        }
        fam.value_type = obs.value_type();
        fam.samples.push(Sample {
            labels: obs.labels().to_vec(),
            value: obs.value(),
        });
    }

    /// Non-empty families, samples sorted by label values.
    fn finish(self) -> Vec<MetricFamily> {
        self.families
            .into_iter()
            .filter(|f| !f.samples.is_empty())
            .map(|mut f| {
                f.sort_samples();
                f
            })
            .collect()
    }
}
