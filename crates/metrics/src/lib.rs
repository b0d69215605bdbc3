//! Metrics and logging for interchain transfers
//!
//! Prometheus counters and histograms cover transfer outcomes, confirmation
//! detectors and latency, broadcast failures, and endpoint failovers. The
//! tracing helpers install a JSON subscriber and carry a correlation id per
//! transfer.
//!
//! # Example
//!
//! ```no_run
//! use interchain_transfer_metrics::{init_tracing_with_metrics, TransferMetrics, DEFAULT_FILTER};
//!
//! let metrics = TransferMetrics::new();
//! init_tracing_with_metrics(metrics, DEFAULT_FILTER).unwrap();
//!
//! metrics.record_transfer_started();
//! println!("{}", metrics.export_metrics().unwrap());
//! ```

pub mod collector;
pub mod metrics;
pub mod tracing;

pub use collector::{MetricsError, TransferMetrics};
pub use tracing::{
    init_tracing, init_tracing_with_metrics, CorrelationId, ErrorContext, MetricsLayer, TracingError,
    TransferSpan, DEFAULT_FILTER,
};
