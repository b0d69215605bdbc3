use std::time::Duration;

use interchain_transfer_types::{ConfirmationStatus, Detector, Transport};
use prometheus::{Encoder, TextEncoder};

use crate::metrics::*;

/// Recording facade over the process-wide transfer metrics
#[derive(Debug, Default, Clone, Copy)]
pub struct TransferMetrics;

impl TransferMetrics {
    pub fn new() -> Self {
        Self
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSFER METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record a transfer entering the composing stage
    pub fn record_transfer_started(&self) {
        TRANSFERS_STARTED.inc();
        ACTIVE_TRANSFERS.inc();
    }

    /// Record a transfer that failed before or during broadcast
    pub fn record_transfer_failed(&self) {
        TRANSFER_OUTCOMES.with_label_values(&["failed"]).inc();
        ACTIVE_TRANSFERS.dec();
    }

    /// Record a broadcast transfer together with its confirmation status
    pub fn record_transfer_completed(&self, status: &ConfirmationStatus) {
        let outcome = match status {
            ConfirmationStatus::Confirmed { .. } => "confirmed",
            _ => "unconfirmed",
        };
        TRANSFER_OUTCOMES.with_label_values(&[outcome]).inc();
        ACTIVE_TRANSFERS.dec();
    }

    pub fn record_stage_duration(&self, stage: &str, duration: Duration) {
        TRANSFER_STAGE_DURATION
            .with_label_values(&[stage])
            .observe(duration.as_millis() as f64);
    }

    pub fn record_broadcast_failure(&self, chain_id: &str) {
        BROADCAST_FAILURES.with_label_values(&[chain_id]).inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIRMATION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record the end of a confirmation wait
    pub fn record_confirmation(&self, status: &ConfirmationStatus, elapsed: Duration) {
        CONFIRMATION_STATUS_COUNT
            .with_label_values(&[status.as_str()])
            .inc();

        if let ConfirmationStatus::Confirmed { by } = status {
            self.record_detector(*by, elapsed);
        }
    }

    fn record_detector(&self, detector: Detector, elapsed: Duration) {
        let label = detector.to_string();
        CONFIRMATIONS_BY_DETECTOR
            .with_label_values(&[label.as_str()])
            .inc();
        CONFIRMATION_LATENCY
            .with_label_values(&[label.as_str()])
            .observe(elapsed.as_millis() as f64);
    }

    pub fn record_event_watcher_error(&self, chain_id: &str) {
        EVENT_WATCHER_ERRORS.with_label_values(&[chain_id]).inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ENDPOINT METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_endpoint_failover(&self, chain_id: &str, transport: Transport) {
        let transport = transport.to_string();
        ENDPOINT_FAILOVERS
            .with_label_values(&[chain_id, transport.as_str()])
            .inc();
    }

    pub fn record_endpoints_exhausted(&self, chain_id: &str, transport: Transport) {
        let transport = transport.to_string();
        ENDPOINTS_EXHAUSTED
            .with_label_values(&[chain_id, transport.as_str()])
            .inc();
    }

    pub fn record_error_event(&self, target: &str) {
        ERROR_EVENTS.with_label_values(&[target]).inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXPORT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Export metrics in Prometheus text format
    pub fn export_metrics(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::EncodingError(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::EncodingError(e.to_string()))
    }
}

/// Metrics error types
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("encoding error: {0}")]
    EncodingError(String),
}
