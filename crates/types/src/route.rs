use serde::{Deserialize, Serialize};

use crate::TRANSFER_PORT;

/// A configured IBC transfer path from one chain to another
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Source chain ID
    pub source_chain: String,

    /// Destination chain ID
    pub dest_chain: String,

    /// Channel on the source chain carrying the first packet
    pub channel: String,

    /// Port on the source chain (typically "transfer")
    #[serde(default = "default_port")]
    pub port: String,

    /// Bech32 prefix of source chain addresses
    pub source_prefix: String,

    /// Bech32 prefix of destination chain addresses
    pub dest_prefix: String,

    /// Forwarding leg through an intermediate chain, if the route is not direct
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward: Option<Forward>,
}

/// Second leg of a multi-hop route, executed by the hop chain's forwarding middleware
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forward {
    /// Intermediate (hop) chain ID
    pub chain_id: String,

    /// Channel on the hop chain towards the destination
    pub channel: String,

    #[serde(default = "default_port")]
    pub port: String,

    /// Address on the hop chain that receives the first leg. Resolved at
    /// transfer time, so usually empty in configuration.
    #[serde(default)]
    pub receiver: String,
}

impl Transfer {
    pub fn direct(
        source_chain: impl Into<String>,
        dest_chain: impl Into<String>,
        channel: impl Into<String>,
        source_prefix: impl Into<String>,
        dest_prefix: impl Into<String>,
    ) -> Self {
        Self {
            source_chain: source_chain.into(),
            dest_chain: dest_chain.into(),
            channel: channel.into(),
            port: default_port(),
            source_prefix: source_prefix.into(),
            dest_prefix: dest_prefix.into(),
            forward: None,
        }
    }

    pub fn with_forward(mut self, forward: Forward) -> Self {
        self.forward = Some(forward);
        self
    }

    pub fn key(&self) -> (String, String) {
        (self.source_chain.clone(), self.dest_chain.clone())
    }

    pub fn is_multi_hop(&self) -> bool {
        self.forward.is_some()
    }

    /// Chain whose block height bounds the first packet's timeout
    pub fn timeout_chain(&self) -> &str {
        match &self.forward {
            Some(forward) => &forward.chain_id,
            None => &self.source_chain,
        }
    }
}

impl Forward {
    pub fn new(chain_id: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            channel: channel.into(),
            port: default_port(),
            receiver: String::new(),
        }
    }

    pub fn with_receiver(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = receiver.into();
        self
    }
}

fn default_port() -> String {
    TRANSFER_PORT.to_string()
}
