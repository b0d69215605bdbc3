use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

lazy_static! {
    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSFER METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Total number of transfers started
    pub static ref TRANSFERS_STARTED: IntCounter = register_int_counter!(
        "interchain_transfer_transfers_started_total",
        "Total number of transfers started"
    )
    .unwrap();

    /// Transfers by outcome (confirmed, unconfirmed, failed)
    pub static ref TRANSFER_OUTCOMES: IntCounterVec = register_int_counter_vec!(
        "interchain_transfer_transfers_total",
        "Total transfers by outcome",
        &["outcome"]
    )
    .unwrap();

    /// Current number of in-flight transfers
    pub static ref ACTIVE_TRANSFERS: IntGauge = register_int_gauge!(
        "interchain_transfer_transfers_active",
        "Current number of in-flight transfers"
    )
    .unwrap();

    /// Time spent per transfer stage (in milliseconds)
    pub static ref TRANSFER_STAGE_DURATION: HistogramVec = register_histogram_vec!(
        "interchain_transfer_stage_duration_ms",
        "Transfer stage duration in milliseconds",
        &["stage"],
        vec![100.0, 500.0, 1000.0, 5000.0, 10000.0, 30000.0, 60000.0, 360000.0]
    )
    .unwrap();

    /// Broadcast failures by source chain
    pub static ref BROADCAST_FAILURES: IntCounterVec = register_int_counter_vec!(
        "interchain_transfer_broadcast_failures_total",
        "Total broadcast failures by chain",
        &["chain_id"]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIRMATION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Confirmation results by status
    pub static ref CONFIRMATION_STATUS_COUNT: IntCounterVec = register_int_counter_vec!(
        "interchain_transfer_confirmation_status_total",
        "Total confirmations by status",
        &["status"]
    )
    .unwrap();

    /// Confirmations by the detector that observed arrival
    pub static ref CONFIRMATIONS_BY_DETECTOR: IntCounterVec = register_int_counter_vec!(
        "interchain_transfer_confirmations_total",
        "Total confirmed arrivals by detector",
        &["detector"]
    )
    .unwrap();

    /// Time from broadcast to observed arrival (in milliseconds)
    pub static ref CONFIRMATION_LATENCY: HistogramVec = register_histogram_vec!(
        "interchain_transfer_confirmation_latency_ms",
        "Confirmation latency in milliseconds",
        &["detector"],
        vec![1000.0, 5000.0, 10000.0, 30000.0, 60000.0, 120000.0, 360000.0]
    )
    .unwrap();

    /// Event watcher failures by destination chain
    pub static ref EVENT_WATCHER_ERRORS: IntCounterVec = register_int_counter_vec!(
        "interchain_transfer_event_watcher_errors_total",
        "Total event watcher failures by chain",
        &["chain_id"]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // ENDPOINT METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Endpoint failovers by chain and transport
    pub static ref ENDPOINT_FAILOVERS: IntCounterVec = register_int_counter_vec!(
        "interchain_transfer_endpoint_failovers_total",
        "Total endpoint failovers",
        &["chain_id", "transport"]
    )
    .unwrap();

    /// Requests that failed on every configured endpoint
    pub static ref ENDPOINTS_EXHAUSTED: IntCounterVec = register_int_counter_vec!(
        "interchain_transfer_endpoints_exhausted_total",
        "Total requests that exhausted all endpoints",
        &["chain_id", "transport"]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // LOGGING
    // ═══════════════════════════════════════════════════════════════════════════

    /// ERROR-level log events by target
    pub static ref ERROR_EVENTS: IntCounterVec = register_int_counter_vec!(
        "interchain_transfer_error_events_total",
        "Total error-level log events by target",
        &["target"]
    )
    .unwrap();
}
