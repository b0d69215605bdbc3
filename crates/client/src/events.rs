//! Websocket subscription for incoming ICS-20 transfers
//!
//! One subscription per wait. The websocket client and the task driving it
//! live in a [`SubscriptionGuard`], so dropping the waiting future tears the
//! connection down.

use futures::StreamExt;
use interchain_transfer_types::Endpoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tendermint_rpc::query::Query;
use tendermint_rpc::{SubscriptionClient, Url, WebSocketClient};
use tokio::task::JoinHandle;

use crate::ChainError;

/// First transfer event seen for a receiver
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub tx_hash: Option<String>,
    pub height: Option<u64>,
    /// Query the event matched
    pub query: String,
    /// Event attributes keyed by `<type>.<key>`
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl TransferEvent {
    pub fn from_attributes(query: String, attributes: BTreeMap<String, Vec<String>>) -> Self {
        let first = |key: &str| attributes.get(key).and_then(|values| values.first()).cloned();

        let tx_hash = first("tx.hash");
        let height = first("tx.height").and_then(|h| h.parse().ok());

        Self {
            tx_hash,
            height,
            query,
            attributes,
        }
    }

    /// Raw payload recorded on transfer results
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// `transfer.recipient = '<receiver>'`
pub fn recipient_query(receiver: &str) -> Query {
    Query::eq("transfer.recipient", receiver)
}

/// Owns a websocket client and its driver task for the life of a wait
pub struct SubscriptionGuard {
    client: Option<WebSocketClient>,
    driver: JoinHandle<()>,
}

impl SubscriptionGuard {
    async fn connect(url: &str, timeout: Duration) -> Result<Self, ChainError> {
        let ws_url: Url = url
            .parse()
            .map_err(|e| ChainError::Subscription(format!("websocket url {}: {}", url, e)))?;

        let (client, driver) = tokio::time::timeout(timeout, WebSocketClient::new(ws_url))
            .await
            .map_err(|_| {
                ChainError::Timeout(format!("websocket {} timed out after {:?}", url, timeout))
            })?
            .map_err(|e| ChainError::Subscription(format!("websocket {}: {}", url, e)))?;

        let url = url.to_string();
        let driver = tokio::spawn(async move {
            if let Err(e) = driver.run().await {
                tracing::debug!(url = %url, error = %e, "Websocket driver stopped");
            }
        });

        Ok(Self {
            client: Some(client),
            driver,
        })
    }

    fn client(&self) -> Result<&WebSocketClient, ChainError> {
        self.client
            .as_ref()
            .ok_or_else(|| ChainError::Subscription("websocket already closed".to_string()))
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            let _ = client.close();
        }
        self.driver.abort();
    }
}

/// Wait for the first transfer to `receiver` on the chain behind `endpoint`
pub async fn wait_for_transfer(
    chain_id: &str,
    endpoint: &Endpoint,
    receiver: &str,
    connect_timeout: Duration,
) -> Result<TransferEvent, ChainError> {
    let url = endpoint.websocket_url();
    let guard = SubscriptionGuard::connect(&url, connect_timeout).await?;

    let query = recipient_query(receiver);
    tracing::debug!(chain_id = %chain_id, query = %query, "Subscribing to transfer events");

    let mut subscription = guard
        .client()?
        .subscribe(query)
        .await
        .map_err(|e| ChainError::Subscription(e.to_string()))?;

    let event = subscription
        .next()
        .await
        .ok_or_else(|| ChainError::Subscription("subscription ended".to_string()))?
        .map_err(|e| ChainError::Subscription(e.to_string()))?;

    let event = TransferEvent::from_attributes(event.query, event.events.unwrap_or_default());

    tracing::info!(
        chain_id = %chain_id,
        receiver = %receiver,
        tx_hash = event.tx_hash.as_deref().unwrap_or(""),
        "Transfer event received"
    );

    Ok(event)
}
