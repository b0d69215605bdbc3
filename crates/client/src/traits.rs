use async_trait::async_trait;
use interchain_transfer_types::Coin;

use crate::{ChainError, TransferEvent};

/// Chain reads the orchestrator needs
#[async_trait]
pub trait ChainQuerier: Send + Sync {
    async fn latest_height(&self, chain_id: &str) -> Result<u64, ChainError>;

    async fn balance(&self, chain_id: &str, address: &str, denom: &str)
        -> Result<Coin, ChainError>;

    /// Address of the signer (or the fee payer) on `chain_id`
    async fn signer_address(&self, chain_id: &str, is_fee_client: bool)
        -> Result<String, ChainError>;
}

/// Resolves when a transfer to `receiver` lands on `chain_id`
#[async_trait]
pub trait TransferEventSource: Send + Sync {
    async fn wait_for_transfer(
        &self,
        chain_id: &str,
        receiver: &str,
    ) -> Result<TransferEvent, ChainError>;
}
