//! # Observability
//!
//! - `metrics`: Prometheus metrics collection
//! - `logging`: tracing subscriber setup

pub mod metrics;
pub mod logging;

pub use metrics::register_metrics;
