use chrono::Utc;
use interchain_transfer_client::{ChainQuerier, ClientRegistry, TransferEventSource};
use interchain_transfer_metrics::{TransferMetrics, TransferSpan};
use interchain_transfer_routing::{build_forward_route, ConnectionRegistry};
use interchain_transfer_types::{
    Coin, ConfirmationStatus, CosmosMsg, Transfer, TransferRequest, TransferResult, TxResponse,
};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn, Instrument};

use crate::confirmation::{self, Confirmation, ConfirmationConfig, ConfirmationTarget};
use crate::error::{ConfirmationError, TransferError};
use crate::ics20::Ics20MsgBuilder;
use crate::scope::CancelScope;
use crate::traits::{BroadcastOptions, Broadcaster, TransferMsgBuilder, TransferMsgParams};

/// Where a transfer is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferStage {
    Composing,
    Broadcasting,
    AwaitingConfirmation,
    Confirmed,
    ConfirmationTimedOut,
}

impl TransferStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStage::Composing => "composing",
            TransferStage::Broadcasting => "broadcasting",
            TransferStage::AwaitingConfirmation => "awaiting_confirmation",
            TransferStage::Confirmed => "confirmed",
            TransferStage::ConfirmationTimedOut => "confirmation_timed_out",
        }
    }
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the orchestrator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Chain this process operates from. Transfers to any other chain go to
    /// the signer's own address there.
    pub base_chain: String,

    pub confirmation: ConfirmationConfig,
}

impl OrchestratorConfig {
    pub fn new(base_chain: impl Into<String>) -> Self {
        Self {
            base_chain: base_chain.into(),
            confirmation: ConfirmationConfig::default(),
        }
    }

    pub fn with_confirmation(mut self, confirmation: ConfirmationConfig) -> Self {
        self.confirmation = confirmation;
        self
    }
}

/// A signable transfer message and the values it was built from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposedTransfer {
    /// Route with the hop receiver filled in
    pub route: Transfer,
    pub sender: String,
    /// Final receiver on the destination chain
    pub receiver: String,
    /// Receiver named in the message itself
    pub wire_receiver: String,
    pub memo: String,
    pub timeout_chain: String,
    pub timeout_height: u64,
    pub msg: CosmosMsg,
}

/// Builder error
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("missing required field: {field}")]
    MissingField { field: String },
}

/// Builder for TransferOrchestrator
#[derive(Default)]
pub struct TransferOrchestratorBuilder {
    routes: Option<Arc<ConnectionRegistry>>,
    querier: Option<Arc<dyn ChainQuerier>>,
    events: Option<Arc<dyn TransferEventSource>>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    msg_builder: Option<Arc<dyn TransferMsgBuilder>>,
    config: Option<OrchestratorConfig>,
    metrics: TransferMetrics,
}

impl TransferOrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the route table
    pub fn with_routes(mut self, routes: Arc<ConnectionRegistry>) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Use a client registry for chain queries and event subscriptions
    pub fn with_client_registry(mut self, clients: Arc<ClientRegistry>) -> Self {
        self.querier = Some(clients.clone());
        self.events = Some(clients);
        self
    }

    pub fn with_querier(mut self, querier: Arc<dyn ChainQuerier>) -> Self {
        self.querier = Some(querier);
        self
    }

    pub fn with_event_source(mut self, events: Arc<dyn TransferEventSource>) -> Self {
        self.events = Some(events);
        self
    }

    /// Set the signer that broadcasts source transactions
    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Override the message encoding. Defaults to [`Ics20MsgBuilder`].
    pub fn with_msg_builder(mut self, msg_builder: Arc<dyn TransferMsgBuilder>) -> Self {
        self.msg_builder = Some(msg_builder);
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_metrics(mut self, metrics: TransferMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Build the TransferOrchestrator, validating that all required fields are set
    pub fn build(self) -> Result<TransferOrchestrator, BuilderError> {
        let routes = self.routes.ok_or_else(|| BuilderError::MissingField {
            field: "routes".to_string(),
        })?;
        let querier = self.querier.ok_or_else(|| BuilderError::MissingField {
            field: "querier".to_string(),
        })?;
        let events = self.events.ok_or_else(|| BuilderError::MissingField {
            field: "events".to_string(),
        })?;
        let broadcaster = self.broadcaster.ok_or_else(|| BuilderError::MissingField {
            field: "broadcaster".to_string(),
        })?;
        let config = self.config.ok_or_else(|| BuilderError::MissingField {
            field: "config".to_string(),
        })?;

        Ok(TransferOrchestrator {
            routes,
            querier,
            events,
            broadcaster,
            msg_builder: self
                .msg_builder
                .unwrap_or_else(|| Arc::new(Ics20MsgBuilder) as Arc<dyn TransferMsgBuilder>),
            config,
            metrics: self.metrics,
        })
    }
}

/// Composes, broadcasts and confirms cross-chain transfers
pub struct TransferOrchestrator {
    routes: Arc<ConnectionRegistry>,
    querier: Arc<dyn ChainQuerier>,
    events: Arc<dyn TransferEventSource>,
    broadcaster: Arc<dyn Broadcaster>,
    msg_builder: Arc<dyn TransferMsgBuilder>,
    config: OrchestratorConfig,
    metrics: TransferMetrics,
}

impl TransferOrchestrator {
    pub fn builder() -> TransferOrchestratorBuilder {
        TransferOrchestratorBuilder::new()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn routes(&self) -> &ConnectionRegistry {
        &self.routes
    }

    /// Resolve addresses, route and timeout for `request` and encode the
    /// source chain message
    pub async fn compose_message(
        &self,
        scope: &CancelScope,
        request: &TransferRequest,
    ) -> Result<ComposedTransfer, TransferError> {
        scope.check()?;

        let sender = if request.sender.is_empty() {
            scope
                .run(
                    self.querier
                        .signer_address(&request.source_chain, request.use_fee_client),
                )
                .await??
        } else {
            request.sender.clone()
        };

        let receiver = if request.dest_chain != self.config.base_chain {
            let own = scope
                .run(self.querier.signer_address(&request.dest_chain, false))
                .await??;
            if !request.receiver.is_empty() && request.receiver != own {
                debug!(
                    requested = %request.receiver,
                    resolved = %own,
                    "Replacing receiver with signer address on destination"
                );
            }
            own
        } else if request.receiver.is_empty() {
            return Err(TransferError::Composition(format!(
                "receiver is required for transfers to {}",
                self.config.base_chain
            )));
        } else {
            request.receiver.clone()
        };

        let mut route = self
            .routes
            .get_connection(&request.source_chain, &request.dest_chain)?;

        if let Some(forward) = route.forward.as_mut() {
            let hop_chain = forward.chain_id.clone();
            forward.receiver = scope
                .run(self.querier.signer_address(&hop_chain, false))
                .await??;
        }

        let (wire_receiver, memo) = build_forward_route(Some(&route), &receiver)?;

        let timeout_chain = route.timeout_chain().to_string();
        let height = scope
            .run(self.querier.latest_height(&timeout_chain))
            .await??;
        let timeout_height = height.saturating_add(request.timeout_blocks);

        let params = TransferMsgParams {
            route: route.clone(),
            source_chain: request.source_chain.clone(),
            amount: request.amount.clone(),
            timeout_chain: timeout_chain.clone(),
            timeout_height,
            sender: sender.clone(),
            receiver: wire_receiver.clone(),
            memo: memo.clone(),
        };
        let msg = self.msg_builder.build(&params)?;

        debug!(
            sender = %sender,
            receiver = %receiver,
            wire_receiver = %wire_receiver,
            timeout_chain = %timeout_chain,
            timeout_height,
            "Composed transfer message"
        );

        Ok(ComposedTransfer {
            route,
            sender,
            receiver,
            wire_receiver,
            memo,
            timeout_chain,
            timeout_height,
            msg,
        })
    }

    /// Sign and broadcast a composed transfer on its source chain
    pub async fn broadcast(
        &self,
        scope: &CancelScope,
        request: &TransferRequest,
        composed: &ComposedTransfer,
    ) -> Result<TxResponse, TransferError> {
        let options = BroadcastOptions {
            fee_client: request.use_fee_client,
            wrap_authorized: request.wrap_authorized,
            fee: request.fee.clone(),
        };

        let chain_id = &request.source_chain;
        let response = scope
            .run(
                self.broadcaster
                    .broadcast(chain_id, vec![composed.msg.clone()], options),
            )
            .await?
            .map_err(|err| {
                self.metrics.record_broadcast_failure(chain_id);
                TransferError::Broadcast {
                    chain_id: chain_id.clone(),
                    reason: err.to_string(),
                }
            })?;

        if !response.is_success() {
            self.metrics.record_broadcast_failure(chain_id);
            return Err(TransferError::Broadcast {
                chain_id: chain_id.clone(),
                reason: format!("code {}: {}", response.code, response.raw_log),
            });
        }

        info!(
            chain_id = %chain_id,
            tx_hash = %response.hash,
            height = response.height,
            "Transfer broadcast"
        );

        Ok(response)
    }

    /// Race balance polling against the transfer event stream for up to `budget`
    pub async fn await_confirmation(
        &self,
        scope: &CancelScope,
        target: ConfirmationTarget,
        budget: Duration,
    ) -> Result<Confirmation, ConfirmationError> {
        let config = self.config.confirmation.clone().with_budget(budget);
        confirmation::await_confirmation(
            self.querier.clone(),
            self.events.clone(),
            scope,
            target,
            &config,
        )
        .await
    }

    /// Compose, broadcast and confirm a transfer.
    ///
    /// Errors only when the source transaction was not broadcast. Once it
    /// has been, the outcome of confirmation is reported in the result.
    pub async fn transfer(
        &self,
        scope: &CancelScope,
        request: TransferRequest,
    ) -> Result<TransferResult, TransferError> {
        let span = TransferSpan::new(request.source_chain.clone(), request.dest_chain.clone());
        self.run_transfer(scope, request)
            .instrument(span.span())
            .await
    }

    async fn run_transfer(
        &self,
        scope: &CancelScope,
        request: TransferRequest,
    ) -> Result<TransferResult, TransferError> {
        let started_at = Utc::now();
        self.metrics.record_transfer_started();

        let (composed, response) = match self.submit(scope, &request).await {
            Ok(submitted) => submitted,
            Err(err) => {
                self.metrics.record_transfer_failed();
                warn!(error = %err, "Transfer failed");
                return Err(err);
            }
        };

        let budget = request
            .confirmation_budget
            .unwrap_or(self.config.confirmation.budget);

        let mut result = TransferResult {
            source_tx_hash: response.hash.clone(),
            dest_tx_hash: None,
            source_response: Some(response),
            dest_response: None,
            error: None,
            confirmation: ConfirmationStatus::NotAwaited,
            started_at,
            finished_at: started_at,
        };

        if budget.is_zero() {
            debug!("Skipping confirmation");
        } else {
            self.confirm(scope, &request, &composed, budget, &mut result)
                .await;
        }

        result.finished_at = Utc::now();
        self.metrics.record_transfer_completed(&result.confirmation);
        Ok(result)
    }

    async fn submit(
        &self,
        scope: &CancelScope,
        request: &TransferRequest,
    ) -> Result<(ComposedTransfer, TxResponse), TransferError> {
        info!(stage = ?TransferStage::Composing, amount = %request.amount, "Transfer stage");
        let stage_started = Instant::now();
        let composed = self.compose_message(scope, request).await?;
        self.metrics
            .record_stage_duration(TransferStage::Composing.as_str(), stage_started.elapsed());

        self.log_sender_balance(scope, request, &composed.sender)
            .await;

        info!(stage = ?TransferStage::Broadcasting, "Transfer stage");
        let stage_started = Instant::now();
        let response = self.broadcast(scope, request, &composed).await?;
        self.metrics.record_stage_duration(
            TransferStage::Broadcasting.as_str(),
            stage_started.elapsed(),
        );

        Ok((composed, response))
    }

    async fn confirm(
        &self,
        scope: &CancelScope,
        request: &TransferRequest,
        composed: &ComposedTransfer,
        budget: Duration,
        result: &mut TransferResult,
    ) {
        info!(stage = ?TransferStage::AwaitingConfirmation, budget = ?budget, "Transfer stage");
        let stage_started = Instant::now();

        let target = ConfirmationTarget {
            chain_id: request.dest_chain.clone(),
            receiver: composed.receiver.clone(),
            expected: Coin {
                denom: request.expected_denom().to_string(),
                amount: request.amount.amount,
            },
        };

        match self.await_confirmation(scope, target, budget).await {
            Ok(confirmation) => {
                info!(
                    stage = ?TransferStage::Confirmed,
                    detector = %confirmation.detector,
                    "Transfer stage"
                );
                result.confirmation = ConfirmationStatus::Confirmed {
                    by: confirmation.detector,
                };
                if let Some(event) = confirmation.event {
                    result.dest_tx_hash = event.tx_hash.clone();
                    result.dest_response = Some(event.to_json());
                }
            }
            Err(err @ ConfirmationError::TimedOut(_)) => {
                warn!(
                    stage = ?TransferStage::ConfirmationTimedOut,
                    source_tx_hash = %result.source_tx_hash,
                    error = %err,
                    "Transfer stage"
                );
                result.confirmation = ConfirmationStatus::TimedOut;
                result.error = Some(err.to_string());
            }
            Err(err) => {
                warn!(
                    source_tx_hash = %result.source_tx_hash,
                    error = %err,
                    "Could not confirm transfer arrival"
                );
                result.confirmation = ConfirmationStatus::Failed {
                    reason: err.to_string(),
                };
                result.error = Some(err.to_string());
            }
        }

        let elapsed = stage_started.elapsed();
        self.metrics
            .record_stage_duration(TransferStage::AwaitingConfirmation.as_str(), elapsed);
        self.metrics.record_confirmation(&result.confirmation, elapsed);
    }

    async fn log_sender_balance(&self, scope: &CancelScope, request: &TransferRequest, sender: &str) {
        let query = self
            .querier
            .balance(&request.source_chain, sender, &request.amount.denom);
        match scope.run(query).await {
            Ok(Ok(balance)) => info!(
                chain_id = %request.source_chain,
                sender = %sender,
                balance = %balance,
                "Pre-transfer balance"
            ),
            Ok(Err(err)) => debug!(
                chain_id = %request.source_chain,
                error = %err,
                "Pre-transfer balance unavailable"
            ),
            Err(_) => {}
        }
    }
}

impl fmt::Debug for TransferOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferOrchestrator")
            .field("config", &self.config)
            .field("routes", &self.routes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BroadcastError;
    use crate::ics20::MsgTransfer;
    use async_trait::async_trait;
    use interchain_transfer_client::{ChainError, TransferEvent};
    use interchain_transfer_routing::ForwardMemo;
    use interchain_transfer_types::{Detector, Forward};
    use prost::Message;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;

    const BASE: &str = "cosmoshub-4";

    /// Fixed signer addresses and heights per chain
    struct MockChains {
        signers: HashMap<String, String>,
        heights: HashMap<String, u64>,
        balance: Mutex<u128>,
        emit_event: bool,
    }

    impl MockChains {
        fn new(emit_event: bool) -> Arc<Self> {
            let signers = [
                ("osmosis-1", "osmo1signer"),
                ("neutron-1", "neutron1signer"),
                ("cosmoshub-4", "cosmos1signer"),
                ("umee-1", "umee1signer"),
            ]
            .into_iter()
            .map(|(chain, address)| (chain.to_string(), address.to_string()))
            .collect();
            let heights = [("osmosis-1", 1_000), ("neutron-1", 2_000), ("cosmoshub-4", 3_000)]
                .into_iter()
                .map(|(chain, height)| (chain.to_string(), height))
                .collect();

            Arc::new(Self {
                signers,
                heights,
                balance: Mutex::new(0),
                emit_event,
            })
        }
    }

    #[async_trait]
    impl ChainQuerier for MockChains {
        async fn latest_height(&self, chain_id: &str) -> Result<u64, ChainError> {
            self.heights
                .get(chain_id)
                .copied()
                .ok_or_else(|| ChainError::ChainNotRegistered(chain_id.to_string()))
        }

        async fn balance(
            &self,
            _chain_id: &str,
            _address: &str,
            denom: &str,
        ) -> Result<Coin, ChainError> {
            Ok(Coin::new(*self.balance.lock().unwrap(), denom))
        }

        async fn signer_address(
            &self,
            chain_id: &str,
            _is_fee_client: bool,
        ) -> Result<String, ChainError> {
            self.signers
                .get(chain_id)
                .cloned()
                .ok_or_else(|| ChainError::ChainNotRegistered(chain_id.to_string()))
        }
    }

    #[async_trait]
    impl TransferEventSource for MockChains {
        async fn wait_for_transfer(
            &self,
            _chain_id: &str,
            _receiver: &str,
        ) -> Result<TransferEvent, ChainError> {
            if !self.emit_event {
                return std::future::pending().await;
            }
            let mut attributes = BTreeMap::new();
            attributes.insert("tx.hash".to_string(), vec!["DEST123".to_string()]);
            Ok(TransferEvent::from_attributes(
                "transfer.recipient = 'x'".to_string(),
                attributes,
            ))
        }
    }

    /// Records every broadcast and answers with a fixed code
    struct MockBroadcaster {
        code: u32,
        fail: bool,
        calls: Mutex<Vec<(String, Vec<CosmosMsg>, BroadcastOptions)>>,
    }

    impl MockBroadcaster {
        fn new(code: u32) -> Arc<Self> {
            Arc::new(Self {
                code,
                fail: false,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                code: 0,
                fail: true,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Broadcaster for MockBroadcaster {
        async fn broadcast(
            &self,
            chain_id: &str,
            msgs: Vec<CosmosMsg>,
            options: BroadcastOptions,
        ) -> Result<TxResponse, BroadcastError> {
            self.calls
                .lock()
                .unwrap()
                .push((chain_id.to_string(), msgs, options));
            if self.fail {
                return Err(BroadcastError::Signing("key locked".to_string()));
            }
            Ok(TxResponse {
                hash: "SRC456".to_string(),
                height: 1_001,
                gas_used: 90_000,
                code: self.code,
                raw_log: if self.code == 0 { String::new() } else { "out of gas".to_string() },
                events: vec![],
            })
        }
    }

    fn routes() -> Arc<ConnectionRegistry> {
        Arc::new(
            ConnectionRegistry::from_routes([
                Transfer::direct("osmosis-1", "neutron-1", "channel-874", "osmo", "neutron"),
                Transfer::direct("neutron-1", "cosmoshub-4", "channel-1", "neutron", "cosmos"),
                Transfer::direct("neutron-1", "umee-1", "channel-1", "neutron", "umee")
                    .with_forward(Forward::new("cosmoshub-4", "channel-184")),
            ])
            .unwrap(),
        )
    }

    fn orchestrator(chains: Arc<MockChains>, broadcaster: Arc<MockBroadcaster>) -> TransferOrchestrator {
        let config = OrchestratorConfig::new(BASE).with_confirmation(
            ConfirmationConfig::default().with_poll_interval(Duration::from_millis(10)),
        );
        TransferOrchestrator::builder()
            .with_routes(routes())
            .with_querier(chains.clone())
            .with_event_source(chains)
            .with_broadcaster(broadcaster)
            .with_config(config)
            .build()
            .unwrap()
    }

    fn decode(composed: &ComposedTransfer) -> MsgTransfer {
        MsgTransfer::decode(composed.msg.value.as_slice()).unwrap()
    }

    #[tokio::test]
    async fn test_compose_direct_route() {
        let orch = orchestrator(MockChains::new(true), MockBroadcaster::new(0));
        let request = TransferRequest::new("osmosis-1", "neutron-1", Coin::new(500, "uosmo"), 100)
            .with_receiver("neutron1someoneelse");

        let composed = orch
            .compose_message(&CancelScope::new(), &request)
            .await
            .unwrap();

        // Not the base chain, so funds go to the signer's own address
        assert_eq!(composed.receiver, "neutron1signer");
        assert_eq!(composed.wire_receiver, "neutron1signer");
        assert_eq!(composed.sender, "osmo1signer");
        assert!(composed.memo.is_empty());
        assert_eq!(composed.timeout_chain, "osmosis-1");
        assert_eq!(composed.timeout_height, 1_100);

        let msg = decode(&composed);
        assert_eq!(msg.source_channel, "channel-874");
        assert_eq!(msg.receiver, "neutron1signer");
        assert_eq!(msg.timeout_height.unwrap().revision_number, 1);
    }

    #[tokio::test]
    async fn test_compose_forwarding_route() {
        let orch = orchestrator(MockChains::new(true), MockBroadcaster::new(0));
        let request = TransferRequest::new("neutron-1", "umee-1", Coin::new(500, "untrn"), 50);

        let composed = orch
            .compose_message(&CancelScope::new(), &request)
            .await
            .unwrap();

        assert_eq!(composed.wire_receiver, "cosmos1signer");
        assert_eq!(composed.receiver, "umee1signer");
        assert_eq!(
            composed.route.forward.as_ref().unwrap().receiver,
            "cosmos1signer"
        );
        assert_eq!(composed.timeout_chain, "cosmoshub-4");
        assert_eq!(composed.timeout_height, 3_050);

        let memo = ForwardMemo::from_memo(&composed.memo).unwrap();
        assert_eq!(memo.channel, "channel-184");
        assert_eq!(memo.port, "transfer");
        assert_eq!(memo.receiver, "umee1signer");

        let msg = decode(&composed);
        assert_eq!(msg.receiver, "cosmos1signer");
        assert_eq!(msg.memo, composed.memo);
        assert_eq!(msg.timeout_height.unwrap().revision_number, 4);
    }

    #[tokio::test]
    async fn test_compose_direct_route_across_revisions() {
        let orch = orchestrator(MockChains::new(true), MockBroadcaster::new(0));
        let request = TransferRequest::new("neutron-1", BASE, Coin::new(500, "untrn"), 10)
            .with_receiver("cosmos1someone");

        let composed = orch
            .compose_message(&CancelScope::new(), &request)
            .await
            .unwrap();
        assert_eq!(composed.timeout_chain, "neutron-1");
        assert_eq!(composed.timeout_height, 2_010);

        // Height from the source, revision from the receiving chain
        let height = decode(&composed).timeout_height.unwrap();
        assert_eq!(height.revision_number, 4);
        assert_eq!(height.revision_height, 2_010);
    }

    #[tokio::test]
    async fn test_compose_base_chain_keeps_receiver() {
        let orch = orchestrator(MockChains::new(true), MockBroadcaster::new(0));

        let request = TransferRequest::new("neutron-1", BASE, Coin::new(500, "untrn"), 10)
            .with_sender("neutron1custom")
            .with_receiver("cosmos1external");
        let composed = orch
            .compose_message(&CancelScope::new(), &request)
            .await
            .unwrap();
        assert_eq!(composed.receiver, "cosmos1external");
        assert_eq!(composed.sender, "neutron1custom");

        let missing = TransferRequest::new("neutron-1", BASE, Coin::new(500, "untrn"), 10);
        let err = orch
            .compose_message(&CancelScope::new(), &missing)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Composition(_)));
    }

    #[tokio::test]
    async fn test_compose_unknown_route() {
        let orch = orchestrator(MockChains::new(true), MockBroadcaster::new(0));
        let request = TransferRequest::new("neutron-1", "osmosis-1", Coin::new(500, "untrn"), 10);

        let err = orch
            .compose_message(&CancelScope::new(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_transfer_confirmed_by_event() {
        let broadcaster = MockBroadcaster::new(0);
        let orch = orchestrator(MockChains::new(true), broadcaster.clone());
        let request = TransferRequest::new("osmosis-1", "neutron-1", Coin::new(500, "uosmo"), 100)
            .with_receive_denom("ibc/498A0751")
            .with_fee(Coin::new(5_000, "uosmo"));

        let result = orch.transfer(&CancelScope::new(), request).await.unwrap();

        assert!(result.is_confirmed());
        assert_eq!(
            result.confirmation,
            ConfirmationStatus::Confirmed { by: Detector::Event }
        );
        assert_eq!(result.source_tx_hash, "SRC456");
        assert_eq!(result.dest_tx_hash.as_deref(), Some("DEST123"));
        assert!(result.dest_response.is_some());
        assert!(result.error.is_none());

        let calls = broadcaster.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (chain_id, msgs, options) = &calls[0];
        assert_eq!(chain_id, "osmosis-1");
        assert_eq!(msgs.len(), 1);
        assert_eq!(options.fee, Some(Coin::new(5_000, "uosmo")));
        assert!(!options.fee_client);
    }

    #[tokio::test]
    async fn test_transfer_confirmed_by_balance() {
        let chains = MockChains::new(false);
        let orch = orchestrator(chains.clone(), MockBroadcaster::new(0));
        let request = TransferRequest::new("osmosis-1", "neutron-1", Coin::new(1_000_000, "uosmo"), 100)
            .with_confirmation_budget(Duration::from_secs(5));

        let crediting = chains.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            *crediting.balance.lock().unwrap() = 990_000;
        });

        let result = orch.transfer(&CancelScope::new(), request).await.unwrap();
        assert_eq!(
            result.confirmation,
            ConfirmationStatus::Confirmed {
                by: Detector::BalancePoll
            }
        );
        assert!(result.dest_tx_hash.is_none());
    }

    #[tokio::test]
    async fn test_transfer_timeout_keeps_source_hash() {
        let orch = orchestrator(MockChains::new(false), MockBroadcaster::new(0));
        let request = TransferRequest::new("osmosis-1", "neutron-1", Coin::new(500, "uosmo"), 100)
            .with_confirmation_budget(Duration::from_millis(50));

        let result = orch.transfer(&CancelScope::new(), request).await.unwrap();

        assert_eq!(result.source_tx_hash, "SRC456");
        assert_eq!(result.confirmation, ConfirmationStatus::TimedOut);
        assert!(!result.is_confirmed());
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_transfer_zero_budget_skips_confirmation() {
        let orch = orchestrator(MockChains::new(false), MockBroadcaster::new(0));
        let request = TransferRequest::new("osmosis-1", "neutron-1", Coin::new(500, "uosmo"), 100)
            .with_confirmation_budget(Duration::ZERO);

        let result = orch.transfer(&CancelScope::new(), request).await.unwrap();
        assert_eq!(result.confirmation, ConfirmationStatus::NotAwaited);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_transfer_rejected_tx_is_an_error() {
        let orch = orchestrator(MockChains::new(true), MockBroadcaster::new(11));
        let request = TransferRequest::new("osmosis-1", "neutron-1", Coin::new(500, "uosmo"), 100);

        let err = orch.transfer(&CancelScope::new(), request).await.unwrap_err();
        match err {
            TransferError::Broadcast { chain_id, reason } => {
                assert_eq!(chain_id, "osmosis-1");
                assert!(reason.contains("out of gas"));
            }
            other => panic!("expected broadcast error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transfer_signer_failure_is_an_error() {
        let orch = orchestrator(MockChains::new(true), MockBroadcaster::failing());
        let request = TransferRequest::new("osmosis-1", "neutron-1", Coin::new(500, "uosmo"), 100);

        let err = orch.transfer(&CancelScope::new(), request).await.unwrap_err();
        assert!(matches!(err, TransferError::Broadcast { .. }));
    }

    #[tokio::test]
    async fn test_transfer_cancelled_before_broadcast() {
        let broadcaster = MockBroadcaster::new(0);
        let orch = orchestrator(MockChains::new(true), broadcaster.clone());
        let scope = CancelScope::new();
        scope.cancel();

        let request = TransferRequest::new("osmosis-1", "neutron-1", Coin::new(500, "uosmo"), 100);
        let err = orch.transfer(&scope, request).await.unwrap_err();

        assert!(matches!(err, TransferError::Cancelled));
        assert!(broadcaster.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_confirmation_is_not_fatal() {
        let orch = orchestrator(MockChains::new(false), MockBroadcaster::new(0));
        let scope = CancelScope::new();
        let canceller = scope.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let request = TransferRequest::new("osmosis-1", "neutron-1", Coin::new(500, "uosmo"), 100)
            .with_confirmation_budget(Duration::from_secs(5));
        let result = orch.transfer(&scope, request).await.unwrap();

        assert_eq!(result.source_tx_hash, "SRC456");
        assert!(matches!(
            result.confirmation,
            ConfirmationStatus::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn test_zero_poll_interval_fails_confirmation() {
        let chains = MockChains::new(true);
        let orch = TransferOrchestrator::builder()
            .with_routes(routes())
            .with_querier(chains.clone())
            .with_event_source(chains)
            .with_broadcaster(MockBroadcaster::new(0))
            .with_config(OrchestratorConfig::new(BASE).with_confirmation(
                ConfirmationConfig::default().with_poll_interval(Duration::ZERO),
            ))
            .build()
            .unwrap();

        let request = TransferRequest::new("osmosis-1", "neutron-1", Coin::new(500, "uosmo"), 100)
            .with_confirmation_budget(Duration::from_secs(5));
        let result = orch.transfer(&CancelScope::new(), request).await.unwrap();

        assert_eq!(result.source_tx_hash, "SRC456");
        match result.confirmation {
            ConfirmationStatus::Failed { reason } => assert!(reason.contains("poll interval")),
            other => panic!("expected failed confirmation, got {other:?}"),
        }
    }

    #[test]
    fn test_builder_missing_fields() {
        let result = TransferOrchestrator::builder().with_routes(routes()).build();
        match result {
            Err(BuilderError::MissingField { field }) => assert_eq!(field, "querier"),
            Ok(_) => panic!("expected MissingField error"),
        }

        let chains = MockChains::new(true);
        let result = TransferOrchestrator::builder()
            .with_routes(routes())
            .with_querier(chains.clone())
            .with_event_source(chains)
            .with_broadcaster(MockBroadcaster::new(0))
            .build();
        assert!(matches!(
            result,
            Err(BuilderError::MissingField { field }) if field == "config"
        ));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(TransferStage::AwaitingConfirmation.to_string(), "awaiting_confirmation");
        assert_eq!(TransferStage::ConfirmationTimedOut.as_str(), "confirmation_timed_out");
    }
}
