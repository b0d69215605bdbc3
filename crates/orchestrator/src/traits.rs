use async_trait::async_trait;
use interchain_transfer_types::{Coin, CosmosMsg, Transfer, TxResponse};

use crate::error::{BroadcastError, TransferError};

/// How the broadcaster should sign and pay for a transaction
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastOptions {
    /// Sign with the fee-payer account instead of the normal signer
    pub fee_client: bool,
    /// Wrap the messages in an authz exec
    pub wrap_authorized: bool,
    pub fee: Option<Coin>,
}

/// Signs and broadcasts transactions
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(
        &self,
        chain_id: &str,
        msgs: Vec<CosmosMsg>,
        options: BroadcastOptions,
    ) -> Result<TxResponse, BroadcastError>;
}

/// Everything needed to encode a transfer message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferMsgParams {
    /// Route with the hop receiver already resolved
    pub route: Transfer,
    pub source_chain: String,
    pub amount: Coin,
    /// Chain whose height bounds the packet timeout. The revision number
    /// comes from the first hop's counterparty instead.
    pub timeout_chain: String,
    pub timeout_height: u64,
    pub sender: String,
    /// Receiver of the first packet (the hop address on forwarding routes)
    pub receiver: String,
    pub memo: String,
}

/// Encodes a transfer for a source chain
pub trait TransferMsgBuilder: Send + Sync {
    fn build(&self, params: &TransferMsgParams) -> Result<CosmosMsg, TransferError>;
}
