//! Exporter self-metrics.
//!
//! Counters about the exporter's own scrapes (query failures, undecodable
//! rows, scrape duration), rendered after the collected warehouse metrics
//! on `/metrics`.

pub mod metrics;
