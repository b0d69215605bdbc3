use serde::{Deserialize, Serialize};

/// Cosmos message for transactions (protobuf Any)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmosMsg {
    pub type_url: String,
    pub value: Vec<u8>,
}

impl CosmosMsg {
    pub fn new(type_url: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            type_url: type_url.into(),
            value,
        }
    }
}

/// ABCI event emitted by a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
}

/// Transaction response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxResponse {
    pub hash: String,
    pub height: u64,
    pub gas_used: u64,
    pub code: u32, // 0 for success
    pub raw_log: String,
    #[serde(default)]
    pub events: Vec<TxEvent>,
}

impl TxResponse {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// First value of `key` among events of type `kind`
    pub fn event_attribute(&self, kind: &str, key: &str) -> Option<&str> {
        self.events
            .iter()
            .filter(|event| event.kind == kind)
            .flat_map(|event| event.attributes.iter())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
