//! End-to-end transfer tests
//!
//! Boots the whole system from `config/local.toml` against an in-memory
//! node. Endpoints point at a closed local port so event subscriptions fail
//! fast and arrival is detected by balance polling.

use async_trait::async_trait;
use interchain_transfer::client::{
    ChainError, ChainQuerier, ChainRpc, ClientRegistry, Connector, GrpcConnector, MemoryKeyring,
    RpcClient,
};
use interchain_transfer::orchestrator::{BroadcastError, BroadcastOptions, MSG_TRANSFER_TYPE_URL};
use interchain_transfer::types::{
    ConfirmationStatus, CosmosMsg, Coin, Detector, Endpoint, TransferRequest, TxResponse,
};
use interchain_transfer::{
    assemble, bootstrap, AppConfig, Broadcaster, CancelScope, ConfigLoader, TransferError,
    TransferSystem,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const VALIDATOR_SECRET: &str = "0000000000000000000000000000000000000000000000000000000000000001";
const OSMO_ATOM: &str = "ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2";

// ═══════════════════════════════════════════════════════════════════════════
// FAKES
// ═══════════════════════════════════════════════════════════════════════════

struct FakeNode {
    height: AtomicU64,
    balances: Mutex<HashMap<(String, String), u128>>,
}

impl FakeNode {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            height: AtomicU64::new(5_000),
            balances: Mutex::new(HashMap::new()),
        })
    }

    fn credit(&self, address: &str, denom: &str, amount: u128) {
        *self
            .balances
            .lock()
            .unwrap()
            .entry((address.to_string(), denom.to_string()))
            .or_default() += amount;
    }
}

#[async_trait]
impl ChainRpc for FakeNode {
    async fn latest_height(&self) -> Result<u64, ChainError> {
        Ok(self.height.load(Ordering::SeqCst))
    }

    async fn balance(&self, address: &str, denom: &str) -> Result<Coin, ChainError> {
        let amount = self
            .balances
            .lock()
            .unwrap()
            .get(&(address.to_string(), denom.to_string()))
            .copied()
            .unwrap_or_default();
        Ok(Coin::new(amount, denom))
    }
}

struct FakeConnector {
    node: Arc<FakeNode>,
}

#[async_trait]
impl Connector<RpcClient> for FakeConnector {
    fn validate(&self, _endpoint: &Endpoint) -> Result<(), ChainError> {
        Ok(())
    }

    async fn connect(
        &self,
        _chain_id: &str,
        _endpoint: &Endpoint,
        _timeout: Duration,
    ) -> Result<RpcClient, ChainError> {
        Ok(self.node.clone())
    }
}

/// Relays every accepted transfer by crediting a pending deposit shortly
/// after broadcast
struct RelayingBroadcaster {
    node: Arc<FakeNode>,
    code: u32,
    deposit: Mutex<Option<(String, String, u128)>>,
    sent: Mutex<Vec<(String, CosmosMsg, BroadcastOptions)>>,
}

impl RelayingBroadcaster {
    fn new(node: Arc<FakeNode>, code: u32) -> Arc<Self> {
        Arc::new(Self {
            node,
            code,
            deposit: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn expect_deposit(&self, address: &str, denom: &str, amount: u128) {
        *self.deposit.lock().unwrap() = Some((address.to_string(), denom.to_string(), amount));
    }
}

#[async_trait]
impl Broadcaster for RelayingBroadcaster {
    async fn broadcast(
        &self,
        chain_id: &str,
        mut msgs: Vec<CosmosMsg>,
        options: BroadcastOptions,
    ) -> Result<TxResponse, BroadcastError> {
        let msg = msgs
            .pop()
            .ok_or_else(|| BroadcastError::Rejected("empty tx".to_string()))?;
        self.sent
            .lock()
            .unwrap()
            .push((chain_id.to_string(), msg, options));

        if self.code == 0 {
            if let Some((address, denom, amount)) = self.deposit.lock().unwrap().take() {
                let node = self.node.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    node.credit(&address, &denom, amount);
                });
            }
        }

        Ok(TxResponse {
            hash: "9F3C1A".to_string(),
            height: 5_001,
            gas_used: 110_000,
            code: self.code,
            raw_log: if self.code == 0 {
                String::new()
            } else {
                "insufficient funds".to_string()
            },
            events: vec![],
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════

fn local_config() -> AppConfig {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/local.toml");
    let mut config = ConfigLoader::from_file(&path).unwrap();

    // Nothing listens here, so event subscriptions fail immediately
    for chain in config.chains.values_mut() {
        for endpoint in &mut chain.rpc_endpoints {
            endpoint.address = "127.0.0.1:1".to_string();
        }
        chain.grpc_endpoints.clear();
    }
    config.orchestrator.poll_interval_secs = 1;
    config.orchestrator.confirmation_timeout_secs = 10;
    config
}

fn keyring() -> Arc<MemoryKeyring> {
    let mut keyring = MemoryKeyring::new();
    keyring.add_hex_secret("validator", VALIDATOR_SECRET).unwrap();
    Arc::new(keyring)
}

async fn local_system(node: Arc<FakeNode>, broadcaster: Arc<dyn Broadcaster>) -> TransferSystem {
    let clients = Arc::new(ClientRegistry::with_connectors(
        keyring(),
        Arc::new(FakeConnector { node }),
        Arc::new(GrpcConnector),
    ));
    assemble(&local_config(), clients, broadcaster).await.unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// TRANSFERS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_transfer_confirmed_by_balance_poll() {
    let node = FakeNode::new();
    let broadcaster = RelayingBroadcaster::new(node.clone(), 0);
    let system = local_system(node.clone(), broadcaster.clone()).await;

    // Away from the base chain the funds go to the signer's own address
    let receiver = system
        .clients
        .signer_address("localosmosis-1", false)
        .await
        .unwrap();
    broadcaster.expect_deposit(&receiver, OSMO_ATOM, 1_000_000);

    let request = TransferRequest::new("localhub-1", "localosmosis-1", Coin::new(1_000_000, "uatom"), 50)
        .with_receiver("osmo1someoneelse")
        .with_receive_denom(OSMO_ATOM);

    let result = system
        .orchestrator
        .transfer(&CancelScope::new(), request)
        .await
        .unwrap();

    assert_eq!(result.source_tx_hash, "9F3C1A");
    assert_eq!(
        result.confirmation,
        ConfirmationStatus::Confirmed {
            by: Detector::BalancePoll
        }
    );
    assert!(result.error.is_none());

    let sent = broadcaster.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "localhub-1");
    assert_eq!(sent[0].1.type_url, MSG_TRANSFER_TYPE_URL);
    assert!(!sent[0].2.fee_client);

    system.shutdown().await;
}

#[tokio::test]
async fn test_transfer_without_arrival_times_out() {
    let node = FakeNode::new();
    let broadcaster = RelayingBroadcaster::new(node.clone(), 0);
    let system = local_system(node, broadcaster).await;

    let request = TransferRequest::new("localhub-1", "localosmosis-1", Coin::new(500, "uatom"), 50)
        .with_confirmation_budget(Duration::from_millis(1_500));

    let result = system
        .orchestrator
        .transfer(&CancelScope::new(), request)
        .await
        .unwrap();

    assert_eq!(result.confirmation, ConfirmationStatus::TimedOut);
    assert!(result.error.is_some());
    assert!(!result.is_confirmed());
}

#[tokio::test]
async fn test_zero_budget_skips_confirmation() {
    let node = FakeNode::new();
    let broadcaster = RelayingBroadcaster::new(node.clone(), 0);
    let system = local_system(node, broadcaster).await;

    let request = TransferRequest::new("localhub-1", "localosmosis-1", Coin::new(500, "uatom"), 50)
        .with_confirmation_budget(Duration::ZERO);

    let result = system
        .orchestrator
        .transfer(&CancelScope::new(), request)
        .await
        .unwrap();
    assert_eq!(result.confirmation, ConfirmationStatus::NotAwaited);
}

#[tokio::test]
async fn test_rejected_broadcast_is_an_error() {
    let node = FakeNode::new();
    let broadcaster = RelayingBroadcaster::new(node.clone(), 5);
    let system = local_system(node, broadcaster).await;

    let request = TransferRequest::new("localhub-1", "localosmosis-1", Coin::new(500, "uatom"), 50);
    let err = system
        .orchestrator
        .transfer(&CancelScope::new(), request)
        .await
        .unwrap_err();

    match err {
        TransferError::Broadcast { chain_id, reason } => {
            assert_eq!(chain_id, "localhub-1");
            assert!(reason.contains("insufficient funds"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unknown_route_is_configuration_error() {
    let node = FakeNode::new();
    let broadcaster = RelayingBroadcaster::new(node.clone(), 0);
    let system = local_system(node, broadcaster.clone()).await;

    let request = TransferRequest::new("localhub-1", "osmosis-1", Coin::new(500, "uatom"), 50);
    let err = system
        .orchestrator
        .transfer(&CancelScope::new(), request)
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::Configuration(_)));
    assert!(broadcaster.sent.lock().unwrap().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// BOOTSTRAP
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_bootstrap_rejects_invalid_config() {
    let mut config = local_config();
    config.orchestrator.base_chain = "juno-1".to_string();

    let broadcaster = RelayingBroadcaster::new(FakeNode::new(), 0);
    let err = bootstrap(&config, keyring(), broadcaster)
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("orchestrator.base_chain"));
}

#[tokio::test]
async fn test_bootstrap_requires_signing_key() {
    let node = FakeNode::new();
    let clients = Arc::new(ClientRegistry::with_connectors(
        Arc::new(MemoryKeyring::new()),
        Arc::new(FakeConnector { node: node.clone() }),
        Arc::new(GrpcConnector),
    ));

    let err = assemble(&local_config(), clients, RelayingBroadcaster::new(node, 0))
        .await
        .err()
        .unwrap();
    assert!(format!("{err:#}").contains("registering chain localhub-1"));
}

#[tokio::test]
async fn test_bootstrap_registers_every_chain() {
    let node = FakeNode::new();
    let system = local_system(node.clone(), RelayingBroadcaster::new(node, 0)).await;

    assert_eq!(
        system.clients.chain_ids().await,
        vec!["localhub-1", "localosmosis-1"]
    );
    assert_eq!(system.routes.len(), 2);
    assert_eq!(system.orchestrator.config().base_chain, "localhub-1");
}
