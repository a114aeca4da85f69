//! Telemetry
//!
//! Observability components for the client. Logging goes through `tracing`
//! events emitted at the call sites; this module holds the metrics seam.

pub mod metrics;

pub use metrics::{
    create_in_memory_metrics, no_op_metrics, ClientMetrics, InMemoryMetrics, MetricEntry,
    MetricLabels, MetricNames, NoOpMetrics,
};
