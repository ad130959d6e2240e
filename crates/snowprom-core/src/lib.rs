//! snowprom core: metric model, exposition format, and error types.
//!
//! This crate defines the descriptor/observation contracts shared by the
//! collector, the registry, and the HTTP layer. It carries no runtime or
//! transport dependencies.
//!
//! Panics, `unwrap`, and `expect` are compile-denied here. Every fallible
//! path surfaces as `SnowpromError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod expo;
pub mod metric;

/// Shared result type.
pub use error::{ErrorClass, Result, SnowpromError};
pub use metric::{MetricDesc, MetricFamily, Observation, Sample, ValueType};
