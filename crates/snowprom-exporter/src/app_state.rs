//! Shared application state for the exporter.
//!
//! Owns the collector registry and the exporter self-metrics. Startup
//! errors are returned to main instead of panicking.

use std::sync::Arc;
use std::time::Duration;

use snowprom_core::error::Result;

use crate::collector::MetricsCollector;
use crate::config::ExporterConfig;
use crate::obs::metrics::ScrapeMetrics;
use crate::registry::Registry;

/// Lower bound for a scrape deadline after the offset is taken off.
pub const MIN_SCRAPE_DEADLINE: Duration = Duration::from_millis(100);

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ExporterConfig,
    registry: Registry,
    metrics: Arc<ScrapeMetrics>,
}

impl AppState {
    /// Build the Snowflake collector from config and register it.
    /// Fails on missing or malformed connection parameters.
    pub fn new(cfg: ExporterConfig) -> Result<Self> {
        let metrics = Arc::new(ScrapeMetrics::new()?);

        let dsn = cfg.snowflake.dsn()?;
        let collector = MetricsCollector::connect(&dsn)?.with_scrape_metrics(Arc::clone(&metrics));

        let mut registry = Registry::new();
        registry.register(Arc::new(collector))?;
        let catalog = registry.describe();
        let names: Vec<&str> = catalog.iter().map(|d| d.name()).collect();
        tracing::info!(metrics = ?names, "snowflake collector registered");

        Ok(Self::from_parts(cfg, registry, metrics))
    }

    /// Assemble from an already-populated registry.
    pub fn from_parts(cfg: ExporterConfig, registry: Registry, metrics: Arc<ScrapeMetrics>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { cfg, registry, metrics }),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn metrics(&self) -> &ScrapeMetrics {
        &self.inner.metrics
    }

    /// Scrape deadline: the requested timeout capped by config, minus the
    /// configured offset, never below `MIN_SCRAPE_DEADLINE`.
    pub fn scrape_deadline(&self, requested: Option<Duration>) -> Duration {
        let ex = &self.inner.cfg.exporter;
        let max = Duration::from_millis(ex.max_scrape_timeout_ms);
        requested
            .map_or(max, |r| r.min(max))
            .saturating_sub(Duration::from_millis(ex.scrape_timeout_offset_ms))
            .max(MIN_SCRAPE_DEADLINE)
    }
}
