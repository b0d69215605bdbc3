//! Cross-chain IBC transfers with confirmation
//!
//! Wires the workspace crates together. [`bootstrap`] turns an [`AppConfig`]
//! into a registered [`ClientRegistry`], a route table and a ready
//! [`TransferOrchestrator`].
//!
//! ```no_run
//! use interchain_transfer::{bootstrap, AppConfig, Broadcaster, CancelScope, ConfigLoader};
//! use interchain_transfer::types::{Coin, TransferRequest};
//! use interchain_transfer::client::MemoryKeyring;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run(broadcaster: Arc<dyn Broadcaster>) -> anyhow::Result<()> {
//! let config = ConfigLoader::from_file(Path::new("config/mainnet.toml"))?;
//! interchain_transfer::init_logging(&config.network)?;
//! let mut keyring = MemoryKeyring::new();
//! keyring.add_hex_secret("transfer", "<hex secret>")?;
//!
//! let system = bootstrap(&config, Arc::new(keyring), broadcaster).await?;
//! let request = TransferRequest::new("osmosis-1", "neutron-1", Coin::new(1_000_000, "uosmo"), 100);
//! let result = system.orchestrator.transfer(&CancelScope::new(), request).await?;
//! println!("{} confirmed: {}", result.source_tx_hash, result.is_confirmed());
//! # Ok(())
//! # }
//! ```

use anyhow::Context;
use interchain_transfer_client::{ClientRegistry, KeyBackend, KeyHandle};
use interchain_transfer_config::NetworkConfig;
use interchain_transfer_metrics::{ErrorContext, TracingError, TransferMetrics};
use interchain_transfer_orchestrator::{ConfirmationConfig, OrchestratorConfig};
use interchain_transfer_routing::RoutingError;
use std::sync::Arc;

pub use interchain_transfer_client as client;
pub use interchain_transfer_config as config;
pub use interchain_transfer_metrics as metrics;
pub use interchain_transfer_orchestrator as orchestrator;
pub use interchain_transfer_routing as routing;
pub use interchain_transfer_types as types;

pub use interchain_transfer_config::{AppConfig, ConfigLoader};
pub use interchain_transfer_orchestrator::{
    Broadcaster, CancelScope, TransferError, TransferOrchestrator,
};
pub use interchain_transfer_routing::ConnectionRegistry;

/// Everything a caller needs to run transfers
pub struct TransferSystem {
    pub clients: Arc<ClientRegistry>,
    pub routes: Arc<ConnectionRegistry>,
    pub orchestrator: Arc<TransferOrchestrator>,
}

impl TransferSystem {
    /// Close every endpoint pool
    pub async fn shutdown(&self) {
        self.clients.close().await;
    }
}

/// Install the global subscriber described by the `[network]` section
pub fn init_logging(network: &NetworkConfig) -> Result<(), TracingError> {
    interchain_transfer_metrics::init_tracing(
        TransferMetrics::new(),
        &network.log_level,
        network.json_logs,
    )
}

/// Validate `config`, register every configured chain and build the
/// orchestrator
pub async fn bootstrap(
    config: &AppConfig,
    keys: Arc<dyn KeyBackend>,
    broadcaster: Arc<dyn Broadcaster>,
) -> anyhow::Result<TransferSystem> {
    assemble(config, Arc::new(ClientRegistry::new(keys)), broadcaster).await
}

/// Like [`bootstrap`], registering chains into an existing client registry
pub async fn assemble(
    config: &AppConfig,
    clients: Arc<ClientRegistry>,
    broadcaster: Arc<dyn Broadcaster>,
) -> anyhow::Result<TransferSystem> {
    interchain_transfer_config::validate_config(config)?;

    let routes = Arc::new(route_table(config).context("building route table")?);

    let keys = key_handle(config);
    for chain in config.sorted_chains() {
        let chain_id = chain.chain_id.clone();
        clients
            .register_client(chain.clone(), keys.clone())
            .await
            .with_chain_id(&chain_id)
            .with_context(|| format!("registering chain {chain_id}"))?;
    }

    let orchestrator = TransferOrchestrator::builder()
        .with_routes(routes.clone())
        .with_client_registry(clients.clone())
        .with_broadcaster(broadcaster)
        .with_config(orchestrator_config(config))
        .with_metrics(TransferMetrics::new())
        .build()?;

    tracing::info!(
        chains = config.chains.len(),
        routes = routes.len(),
        base_chain = %config.orchestrator.base_chain,
        "Transfer system ready"
    );

    Ok(TransferSystem {
        clients,
        routes,
        orchestrator: Arc::new(orchestrator),
    })
}

/// Configured routes, then any built-in mainnet route for a pair the
/// configuration does not cover
pub fn route_table(config: &AppConfig) -> Result<ConnectionRegistry, RoutingError> {
    let routes = ConnectionRegistry::from_routes(config.routes.iter().cloned())?;

    if config.orchestrator.seed_mainnet_routes {
        for route in ConnectionRegistry::with_mainnet_routes().get_all_connections() {
            match routes.register_connection(route) {
                Ok(()) | Err(RoutingError::DuplicateRoute { .. }) => {}
                Err(err) => return Err(err),
            }
        }
    }

    Ok(routes)
}

/// Orchestrator settings from the `[orchestrator]` section
pub fn orchestrator_config(config: &AppConfig) -> OrchestratorConfig {
    let settings = &config.orchestrator;
    let confirmation = ConfirmationConfig {
        budget: settings.confirmation_timeout(),
        poll_interval: settings.poll_interval(),
        threshold_bps: settings.arrival_threshold_bps,
    };
    OrchestratorConfig::new(settings.base_chain.clone()).with_confirmation(confirmation)
}

fn key_handle(config: &AppConfig) -> KeyHandle {
    let handle = KeyHandle::new(config.signer.key_name.clone());
    match &config.signer.fee_key_name {
        Some(fee_key) => handle.with_fee_key(fee_key.clone()),
        None => handle,
    }
}
