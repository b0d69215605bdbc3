use async_trait::async_trait;
use interchain_transfer_types::{Coin, Endpoint};
use prost::Message;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tendermint_rpc::{Client, HttpClient};

use crate::endpoint::Connector;
use crate::proto::{QueryBalanceRequest, QueryBalanceResponse, BANK_BALANCE_PATH};
use crate::ChainError;

/// Queries served by a chain's tendermint RPC endpoint
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn latest_height(&self) -> Result<u64, ChainError>;

    /// Bank balance of `address` in `denom`. An unknown account or denom is
    /// a zero balance, not an error.
    async fn balance(&self, address: &str, denom: &str) -> Result<Coin, ChainError>;
}

/// Shared RPC client handle as cached by endpoint pools
pub type RpcClient = Arc<dyn ChainRpc>;

/// Chain RPC over tendermint's HTTP JSON-RPC
pub struct TendermintRpc {
    chain_id: String,
    url: String,
    client: HttpClient,
    request_timeout: Duration,
}

impl TendermintRpc {
    pub fn new(
        chain_id: impl Into<String>,
        endpoint: &Endpoint,
        request_timeout: Duration,
    ) -> Result<Self, ChainError> {
        let url = endpoint.rpc_url();
        let client = HttpClient::new(url.as_str()).map_err(|e| ChainError::InvalidEndpoint {
            address: endpoint.address.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            chain_id: chain_id.into(),
            url,
            client,
            request_timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn timed<T, E, F>(&self, what: &str, fut: F) -> Result<T, ChainError>
    where
        E: Display,
        F: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ChainError::ConnectionFailed(format!(
                "{} on {} failed: {}",
                what, self.url, e
            ))),
            Err(_) => Err(ChainError::Timeout(format!(
                "{} on {} timed out after {:?}",
                what, self.url, self.request_timeout
            ))),
        }
    }
}

#[async_trait]
impl ChainRpc for TendermintRpc {
    async fn latest_height(&self) -> Result<u64, ChainError> {
        let status = self.timed("status", self.client.status()).await?;
        Ok(status.sync_info.latest_block_height.value())
    }

    async fn balance(&self, address: &str, denom: &str) -> Result<Coin, ChainError> {
        let request = QueryBalanceRequest {
            address: address.to_string(),
            denom: denom.to_string(),
        };

        let response = self
            .timed(
                "balance query",
                self.client.abci_query(
                    Some(BANK_BALANCE_PATH.to_string()),
                    request.encode_to_vec(),
                    None,
                    false,
                ),
            )
            .await?;

        if response.code.is_err() {
            if response.log.contains("not found") {
                return Ok(Coin::zero(denom));
            }
            return Err(ChainError::QueryFailed(format!(
                "balance query on {} returned code {:?}: {}",
                self.chain_id, response.code, response.log
            )));
        }

        if response.value.is_empty() {
            return Ok(Coin::zero(denom));
        }

        let decoded = QueryBalanceResponse::decode(response.value.as_slice())
            .map_err(|e| ChainError::Encoding(format!("balance response: {}", e)))?;

        match decoded.balance {
            Some(coin) => Coin::try_from(coin),
            None => Ok(Coin::zero(denom)),
        }
    }
}

/// Connector producing [`TendermintRpc`] clients. Connecting queries the
/// endpoint's status so unreachable nodes are skipped at checkout.
#[derive(Debug, Default, Clone, Copy)]
pub struct RpcConnector;

#[async_trait]
impl Connector<RpcClient> for RpcConnector {
    fn validate(&self, endpoint: &Endpoint) -> Result<(), ChainError> {
        for url in [endpoint.rpc_url(), endpoint.websocket_url()] {
            url.parse::<tendermint_rpc::Url>()
                .map_err(|e| ChainError::InvalidEndpoint {
                    address: endpoint.address.clone(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    async fn connect(
        &self,
        chain_id: &str,
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<RpcClient, ChainError> {
        let rpc = TendermintRpc::new(chain_id, endpoint, timeout)?;
        let height = rpc.latest_height().await?;

        tracing::debug!(
            chain_id = %chain_id,
            url = %rpc.url(),
            height = height,
            "RPC endpoint reachable"
        );

        Ok(Arc::new(rpc))
    }
}
