//! snowprom exporter library entry.
//!
//! Wires the warehouse client, the usage collector, the registry, and the
//! HTTP surface together. Consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod app_state;
pub mod collector;
pub mod config;
pub mod obs;
pub mod ops;
pub mod registry;
pub mod router;
pub mod warehouse;
