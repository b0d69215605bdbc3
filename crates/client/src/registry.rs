use async_trait::async_trait;
use interchain_transfer_types::{ChainConfig, Coin, Endpoint, Transport};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::transport::Channel;

use crate::endpoint::{Connector, EndpointPool};
use crate::events;
use crate::grpc::GrpcConnector;
use crate::keys::{account_address, KeyBackend};
use crate::rpc::{RpcClient, RpcConnector};
use crate::traits::{ChainQuerier, TransferEventSource};
use crate::{ChainError, TransferEvent};

/// Names of the keys a chain signs with
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyHandle {
    pub key_name: String,
    /// Pays fees when a request asks for the fee client. Falls back to
    /// `key_name` when unset.
    pub fee_key_name: Option<String>,
}

impl KeyHandle {
    pub fn new(key_name: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
            fee_key_name: None,
        }
    }

    pub fn with_fee_key(mut self, fee_key_name: impl Into<String>) -> Self {
        self.fee_key_name = Some(fee_key_name.into());
        self
    }

    fn select(&self, is_fee_client: bool) -> &str {
        match (&self.fee_key_name, is_fee_client) {
            (Some(fee_key), true) => fee_key,
            _ => &self.key_name,
        }
    }
}

/// A chain client bound to one signing key and the active RPC endpoint
#[derive(Clone)]
pub struct SigningClient {
    pub chain_id: String,
    pub key_name: String,
    pub address: String,
    pub endpoint: Endpoint,
    pub rpc: RpcClient,
}

impl fmt::Debug for SigningClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningClient")
            .field("chain_id", &self.chain_id)
            .field("key_name", &self.key_name)
            .field("address", &self.address)
            .field("endpoint", &self.endpoint.address)
            .finish()
    }
}

struct ClientEntry {
    chain: ChainConfig,
    keys: KeyHandle,
    rpc: Option<EndpointPool<RpcClient>>,
    grpc: Option<EndpointPool<Channel>>,
}

impl ClientEntry {
    async fn close(&self) {
        if let Some(pool) = &self.rpc {
            pool.close().await;
        }
        if let Some(pool) = &self.grpc {
            pool.close().await;
        }
    }

    fn first_endpoint(&self, transport: Transport) -> Result<&Endpoint, ChainError> {
        self.chain
            .endpoints(transport)
            .first()
            .ok_or_else(|| ChainError::NoEndpoints {
                chain_id: self.chain.chain_id.clone(),
                transport,
            })
    }

    /// Endpoint currently serving RPC for this chain
    async fn rpc_endpoint(&self) -> Result<Endpoint, ChainError> {
        match &self.rpc {
            Some(pool) => Ok(pool.current_endpoint().await),
            None => self.first_endpoint(Transport::Rpc).cloned(),
        }
    }
}

/// Registered chains and their endpoint pools
pub struct ClientRegistry {
    chains: RwLock<HashMap<String, Arc<ClientEntry>>>,
    keys: Arc<dyn KeyBackend>,
    rpc_connector: Arc<dyn Connector<RpcClient>>,
    grpc_connector: Arc<dyn Connector<Channel>>,
}

impl ClientRegistry {
    /// Registry using tendermint RPC and tonic gRPC connectors
    pub fn new(keys: Arc<dyn KeyBackend>) -> Self {
        Self::with_connectors(keys, Arc::new(RpcConnector), Arc::new(GrpcConnector))
    }

    pub fn with_connectors(
        keys: Arc<dyn KeyBackend>,
        rpc_connector: Arc<dyn Connector<RpcClient>>,
        grpc_connector: Arc<dyn Connector<Channel>>,
    ) -> Self {
        Self {
            chains: RwLock::new(HashMap::new()),
            keys,
            rpc_connector,
            grpc_connector,
        }
    }

    /// Register a chain. A chain id can be registered once; a second call
    /// fails and leaves the first registration in place.
    pub async fn register_client(
        &self,
        chain: ChainConfig,
        keys: KeyHandle,
    ) -> Result<(), ChainError> {
        let mut chains = self.chains.write().await;

        if chains.contains_key(&chain.chain_id) {
            return Err(ChainError::ChainAlreadyRegistered(chain.chain_id));
        }

        if chain.rpc_endpoints.is_empty() {
            return Err(ChainError::NoEndpoints {
                chain_id: chain.chain_id,
                transport: Transport::Rpc,
            });
        }

        self.keys.public_key(&keys.key_name)?;
        if let Some(fee_key) = &keys.fee_key_name {
            self.keys.public_key(fee_key)?;
        }

        let (rpc, grpc) = if chain.endpoint_failover {
            self.build_pools(&chain).await?
        } else {
            // Only the first endpoint of each transport is ever dialed
            if let Some(endpoint) = chain.rpc_endpoints.first() {
                self.rpc_connector.validate(endpoint)?;
            }
            if let Some(endpoint) = chain.grpc_endpoints.first() {
                self.grpc_connector.validate(endpoint)?;
            }
            (None, None)
        };

        tracing::info!(
            chain_id = %chain.chain_id,
            rpc_endpoints = chain.rpc_endpoints.len(),
            grpc_endpoints = chain.grpc_endpoints.len(),
            failover = chain.endpoint_failover,
            "Registered chain"
        );

        chains.insert(
            chain.chain_id.clone(),
            Arc::new(ClientEntry {
                chain,
                keys,
                rpc,
                grpc,
            }),
        );
        Ok(())
    }

    async fn build_pools(
        &self,
        chain: &ChainConfig,
    ) -> Result<
        (
            Option<EndpointPool<RpcClient>>,
            Option<EndpointPool<Channel>>,
        ),
        ChainError,
    > {
        let rpc = EndpointPool::new(
            chain.chain_id.clone(),
            Transport::Rpc,
            chain.rpc_endpoints.clone(),
            self.rpc_connector.clone(),
        )?
        .with_request_timeout(chain.request_timeout());

        if chain.grpc_endpoints.is_empty() {
            return Ok((Some(rpc), None));
        }

        match EndpointPool::new(
            chain.chain_id.clone(),
            Transport::Grpc,
            chain.grpc_endpoints.clone(),
            self.grpc_connector.clone(),
        ) {
            Ok(grpc) => Ok((
                Some(rpc),
                Some(grpc.with_request_timeout(chain.request_timeout())),
            )),
            Err(e) => {
                rpc.close().await;
                Err(e)
            }
        }
    }

    async fn entry(&self, chain_id: &str) -> Result<Arc<ClientEntry>, ChainError> {
        self.chains
            .read()
            .await
            .get(chain_id)
            .cloned()
            .ok_or_else(|| ChainError::ChainNotRegistered(chain_id.to_string()))
    }

    pub async fn is_registered(&self, chain_id: &str) -> bool {
        self.chains.read().await.contains_key(chain_id)
    }

    pub async fn chain_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.chains.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn chain_config(&self, chain_id: &str) -> Result<ChainConfig, ChainError> {
        Ok(self.entry(chain_id).await?.chain.clone())
    }

    async fn rpc_client(&self, entry: &ClientEntry) -> Result<(Endpoint, RpcClient), ChainError> {
        match &entry.rpc {
            Some(pool) => pool.get_client_and_endpoint().await,
            None => {
                let endpoint = entry.first_endpoint(Transport::Rpc)?.clone();
                let client = self
                    .rpc_connector
                    .connect(&entry.chain.chain_id, &endpoint, entry.chain.request_timeout())
                    .await?;
                Ok((endpoint, client))
            }
        }
    }

    /// Signing client for the chain's signer, or its fee payer
    pub async fn get_client(
        &self,
        chain_id: &str,
        is_fee_client: bool,
    ) -> Result<SigningClient, ChainError> {
        let entry = self.entry(chain_id).await?;
        let (key_name, address) = self.signer_of(&entry, is_fee_client)?;
        let (endpoint, rpc) = self.rpc_client(&entry).await?;

        Ok(SigningClient {
            chain_id: chain_id.to_string(),
            key_name,
            address,
            endpoint,
            rpc,
        })
    }

    pub async fn get_height(&self, chain_id: &str) -> Result<u64, ChainError> {
        let entry = self.entry(chain_id).await?;
        match &entry.rpc {
            Some(pool) => {
                pool.with_failover(|rpc| async move { rpc.latest_height().await })
                    .await
            }
            None => self.rpc_client(&entry).await?.1.latest_height().await,
        }
    }

    pub async fn get_balance(
        &self,
        chain_id: &str,
        address: &str,
        denom: &str,
    ) -> Result<Coin, ChainError> {
        let entry = self.entry(chain_id).await?;
        match &entry.rpc {
            Some(pool) => {
                pool.with_failover(|rpc| {
                    let address = address.to_string();
                    let denom = denom.to_string();
                    async move { rpc.balance(&address, &denom).await }
                })
                .await
            }
            None => {
                self.rpc_client(&entry)
                    .await?
                    .1
                    .balance(address, denom)
                    .await
            }
        }
    }

    /// Key name and bech32 address of the chain's signer (or fee payer)
    pub async fn get_signer_account_and_address(
        &self,
        chain_id: &str,
        is_fee_client: bool,
    ) -> Result<(String, String), ChainError> {
        let entry = self.entry(chain_id).await?;
        self.signer_of(&entry, is_fee_client)
    }

    fn signer_of(
        &self,
        entry: &ClientEntry,
        is_fee_client: bool,
    ) -> Result<(String, String), ChainError> {
        let key_name = entry.keys.select(is_fee_client);
        let public_key = self.keys.public_key(key_name)?;
        let address = account_address(&entry.chain.address_prefix, &public_key)?;
        Ok((key_name.to_string(), address))
    }

    /// Active gRPC channel, for callers that encode their own queries
    pub async fn grpc_channel(&self, chain_id: &str) -> Result<Channel, ChainError> {
        let entry = self.entry(chain_id).await?;
        match &entry.grpc {
            Some(pool) => pool.get_client().await,
            None => {
                let endpoint = entry.first_endpoint(Transport::Grpc)?;
                self.grpc_connector
                    .connect(chain_id, endpoint, entry.chain.request_timeout())
                    .await
            }
        }
    }

    /// Close every pool and forget all chains
    pub async fn close(&self) {
        let entries: Vec<_> = self.chains.write().await.drain().collect();
        for (chain_id, entry) in entries {
            entry.close().await;
            tracing::debug!(chain_id = %chain_id, "Closed chain clients");
        }
    }
}

#[async_trait]
impl ChainQuerier for ClientRegistry {
    async fn latest_height(&self, chain_id: &str) -> Result<u64, ChainError> {
        self.get_height(chain_id).await
    }

    async fn balance(
        &self,
        chain_id: &str,
        address: &str,
        denom: &str,
    ) -> Result<Coin, ChainError> {
        self.get_balance(chain_id, address, denom).await
    }

    async fn signer_address(
        &self,
        chain_id: &str,
        is_fee_client: bool,
    ) -> Result<String, ChainError> {
        self.get_signer_account_and_address(chain_id, is_fee_client)
            .await
            .map(|(_, address)| address)
    }
}

#[async_trait]
impl TransferEventSource for ClientRegistry {
    async fn wait_for_transfer(
        &self,
        chain_id: &str,
        receiver: &str,
    ) -> Result<TransferEvent, ChainError> {
        let entry = self.entry(chain_id).await?;
        let endpoint = entry.rpc_endpoint().await?;
        events::wait_for_transfer(chain_id, &endpoint, receiver, entry.chain.request_timeout())
            .await
    }
}
