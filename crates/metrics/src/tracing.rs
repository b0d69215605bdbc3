use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::collector::TransferMetrics;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,interchain_transfer=debug";

/// Initialize JSON tracing with error-event metrics.
///
/// `RUST_LOG` takes precedence over `default_filter`.
pub fn init_tracing_with_metrics(
    metrics: TransferMetrics,
    default_filter: &str,
) -> Result<(), TracingError> {
    init_tracing(metrics, default_filter, true)
}

/// Initialize tracing with error-event metrics, as JSON lines or as
/// human-readable text
pub fn init_tracing(
    metrics: TransferMetrics,
    default_filter: &str,
    json: bool,
) -> Result<(), TracingError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let json_layer = json.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .json()
    });
    let text_layer = (!json).then(|| fmt::layer().with_target(true).with_level(true));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(MetricsLayer::new(metrics))
        .try_init()
        .map_err(|e| TracingError::InitError(e.to_string()))?;

    Ok(())
}

/// Tracing layer that counts ERROR-level events by target
pub struct MetricsLayer {
    metrics: TransferMetrics,
}

impl MetricsLayer {
    pub fn new(metrics: TransferMetrics) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for MetricsLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() == Level::ERROR {
            self.metrics.record_error_event(metadata.target());
        }
    }
}

/// Correlation ID for following one transfer through the logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(uuid::Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Span context for a single transfer
#[derive(Debug, Clone)]
pub struct TransferSpan {
    pub correlation_id: CorrelationId,
    pub source_chain: String,
    pub dest_chain: String,
}

impl TransferSpan {
    pub fn new(source_chain: impl Into<String>, dest_chain: impl Into<String>) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            source_chain: source_chain.into(),
            dest_chain: dest_chain.into(),
        }
    }

    /// Build the tracing span for this transfer. Attach it to futures with
    /// `tracing::Instrument` rather than entering it across awaits.
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "transfer",
            correlation_id = %self.correlation_id,
            source_chain = %self.source_chain,
            dest_chain = %self.dest_chain,
        )
    }
}

/// Log an error with its chain on the way up
pub trait ErrorContext {
    fn with_chain_id(self, chain_id: &str) -> Self;
}

impl<T, E> ErrorContext for Result<T, E>
where
    E: std::fmt::Display,
{
    fn with_chain_id(self, chain_id: &str) -> Self {
        self.map_err(|e| {
            tracing::error!(
                chain_id = %chain_id,
                error = %e,
                "error occurred"
            );
            e
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("tracing initialization error: {0}")]
    InitError(String),
}
