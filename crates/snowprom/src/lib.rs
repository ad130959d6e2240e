//! Top-level facade crate for snowprom.
//!
//! Re-exports the metric model and the exporter library so users can depend on a single crate.

pub mod core {
    pub use snowprom_core::*;
}

pub mod exporter {
    pub use snowprom_exporter::*;
}
