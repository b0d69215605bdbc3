use interchain_transfer_types::Transfer;
use serde::{Deserialize, Serialize};

use crate::RoutingError;

/// Packet-forward instruction carried in an ICS-20 memo.
///
/// Serializes as `{"forward":{"channel":..,"port":..,"receiver":..}}`, with
/// `retries` and `timeout` present only when set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardMemo {
    pub channel: String,
    pub port: String,
    pub receiver: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u8>,

    /// Forward timeout in nanoseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    forward: ForwardMemo,
}

impl ForwardMemo {
    pub fn new(
        channel: impl Into<String>,
        port: impl Into<String>,
        receiver: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            port: port.into(),
            receiver: receiver.into(),
            retries: None,
            timeout: None,
        }
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_timeout(mut self, timeout: i64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Encode as the memo string placed on the first-hop transfer
    pub fn to_memo(&self) -> Result<String, RoutingError> {
        Ok(serde_json::to_string(&Envelope {
            forward: self.clone(),
        })?)
    }

    /// Decode a memo string produced by [`ForwardMemo::to_memo`] or by another
    /// forwarding-aware client
    pub fn from_memo(memo: &str) -> Result<Self, RoutingError> {
        let envelope: Envelope = serde_json::from_str(memo)?;
        Ok(envelope.forward)
    }
}

/// Resolve the on-wire receiver and memo for a transfer along `route`.
///
/// A direct route sends straight to `final_receiver` with an empty memo. A
/// forwarding route names the hop chain address (`forward.receiver`) as the
/// wire receiver, and the memo tells the hop chain to pass the funds on to
/// `final_receiver`. The hop receiver must be resolved before calling this.
pub fn build_forward_route(
    route: Option<&Transfer>,
    final_receiver: &str,
) -> Result<(String, String), RoutingError> {
    let route = route.ok_or(RoutingError::NilRoute)?;

    let Some(forward) = &route.forward else {
        return Ok((final_receiver.to_string(), String::new()));
    };

    if forward.receiver.is_empty() {
        return Err(RoutingError::EmptyForwardReceiver);
    }

    let memo = ForwardMemo::new(&forward.channel, &forward.port, final_receiver).to_memo()?;

    tracing::debug!(
        source_chain = %route.source_chain,
        hop_chain = %forward.chain_id,
        dest_chain = %route.dest_chain,
        wire_receiver = %forward.receiver,
        "Built forward memo"
    );

    Ok((forward.receiver.clone(), memo))
}
