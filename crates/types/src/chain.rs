use serde::{Deserialize, Serialize};
use std::fmt;

/// Network transport an endpoint pool serves
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Rpc,
    Grpc,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Rpc => write!(f, "rpc"),
            Transport::Grpc => write!(f, "grpc"),
        }
    }
}

/// A single network endpoint for a chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Host (and optional port/path), with or without a scheme
    pub address: String,

    /// Websocket path appended for event subscriptions
    #[serde(default)]
    pub websocket_path: Option<String>,

    /// Provider API key, appended as a path segment on RPC and websocket URLs
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub use_tls: bool,
}

impl Endpoint {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            websocket_path: None,
            api_key: None,
            use_tls: false,
        }
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_websocket_path(mut self, path: impl Into<String>) -> Self {
        self.websocket_path = Some(path.into());
        self
    }

    /// HTTP(S) URL for tendermint RPC requests
    pub fn rpc_url(&self) -> String {
        let mut url = self.base_url("https", "http");
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            url.push('/');
            url.push_str(key);
        }
        url
    }

    /// WS(S) URL for tendermint event subscriptions
    pub fn websocket_url(&self) -> String {
        let base = self.rpc_url();
        let mut url = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base
        };

        let path = self.websocket_path.as_deref().unwrap_or("/websocket");
        if !path.starts_with('/') {
            url.push('/');
        }
        url.push_str(path);
        url
    }

    /// HTTP(S) URL for gRPC channels
    pub fn grpc_url(&self) -> String {
        self.base_url("https", "http")
    }

    fn base_url(&self, tls_scheme: &str, plain_scheme: &str) -> String {
        let address = self.address.trim_end_matches('/');
        if address.contains("://") {
            address.to_string()
        } else if self.use_tls {
            format!("{tls_scheme}://{address}")
        } else {
            format!("{plain_scheme}://{address}")
        }
    }
}

/// Configuration of a chain the orchestrator can transfer to or from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain identifier (e.g., "osmosis-1")
    pub chain_id: String,

    /// Bech32 address prefix (e.g., "osmo")
    pub address_prefix: String,

    /// RPC endpoints in failover order
    #[serde(default)]
    pub rpc_endpoints: Vec<Endpoint>,

    /// gRPC endpoints in failover order
    #[serde(default)]
    pub grpc_endpoints: Vec<Endpoint>,

    /// Fee denomination
    #[serde(default)]
    pub fee_denom: String,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Build failover pools. When disabled every access dials the first endpoint.
    #[serde(default = "default_true")]
    pub endpoint_failover: bool,
}

impl ChainConfig {
    pub fn new(chain_id: impl Into<String>, address_prefix: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            address_prefix: address_prefix.into(),
            rpc_endpoints: Vec::new(),
            grpc_endpoints: Vec::new(),
            fee_denom: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
            endpoint_failover: true,
        }
    }

    pub fn with_rpc(mut self, endpoint: Endpoint) -> Self {
        self.rpc_endpoints.push(endpoint);
        self
    }

    pub fn with_grpc(mut self, endpoint: Endpoint) -> Self {
        self.grpc_endpoints.push(endpoint);
        self
    }

    pub fn with_fee_denom(mut self, denom: impl Into<String>) -> Self {
        self.fee_denom = denom.into();
        self
    }

    pub fn endpoints(&self, transport: Transport) -> &[Endpoint] {
        match transport {
            Transport::Rpc => &self.rpc_endpoints,
            Transport::Grpc => &self.grpc_endpoints,
        }
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}
