//! Core configuration structures for interchain transfers

use interchain_transfer_types::{ChainConfig, Transfer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Network configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Chain configurations by name
    #[serde(default)]
    pub chains: HashMap<String, ChainConfig>,

    /// Transfer routes. Added on top of the built-in mainnet routes when
    /// `orchestrator.seed_mainnet_routes` is set.
    #[serde(default)]
    pub routes: Vec<Transfer>,

    /// Signing key names
    #[serde(default)]
    pub signer: SignerConfig,

    /// Orchestrator configuration
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
}

impl AppConfig {
    /// Chain configuration by chain ID rather than by name
    pub fn chain(&self, chain_id: &str) -> Option<&ChainConfig> {
        self.chains.values().find(|chain| chain.chain_id == chain_id)
    }

    /// Chain configurations sorted by chain ID
    pub fn sorted_chains(&self) -> Vec<&ChainConfig> {
        let mut chains: Vec<_> = self.chains.values().collect();
        chains.sort_by(|a, b| a.chain_id.cmp(&b.chain_id));
        chains
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Log filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log as JSON lines
    #[serde(default = "default_true")]
    pub json_logs: bool,
}

/// Names of the keys used to sign on every chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerConfig {
    /// Key that signs transfers
    #[serde(default = "default_key_name")]
    pub key_name: String,

    /// Key that pays fees for fee-client transfers. Falls back to `key_name`.
    #[serde(default)]
    pub fee_key_name: Option<String>,
}

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    /// Chain the process operates from. Transfers elsewhere go to the
    /// signer's own address on the destination.
    #[serde(default)]
    pub base_chain: String,

    /// Default wait for arrival, in seconds. Zero skips confirmation.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,

    /// Balance poll interval in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Share of the sent amount that must arrive, in basis points
    #[serde(default = "default_arrival_threshold_bps")]
    pub arrival_threshold_bps: u32,

    /// Start from the built-in mainnet route table
    #[serde(default = "default_true")]
    pub seed_mainnet_routes: bool,
}

impl OrchestratorSettings {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_key_name() -> String {
    "default".to_string()
}

fn default_confirmation_timeout_secs() -> u64 {
    360 // 6 minutes
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_arrival_threshold_bps() -> u32 {
    9_500 // 95%
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: default_true(),
        }
    }
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            key_name: default_key_name(),
            fee_key_name: None,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            base_chain: String::new(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            arrival_threshold_bps: default_arrival_threshold_bps(),
            seed_mainnet_routes: default_true(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interchain_transfer_types::Endpoint;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(
            config.network,
            NetworkConfig {
                log_level: "info".to_string(),
                json_logs: true,
            }
        );
        assert_eq!(config.signer.key_name, "default");
        assert_eq!(
            config.orchestrator.confirmation_timeout(),
            Duration::from_secs(360)
        );
        assert_eq!(config.orchestrator.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.orchestrator.arrival_threshold_bps, 9_500);
        assert!(config.orchestrator.seed_mainnet_routes);
    }

    #[test]
    fn test_chain_lookup_by_id() {
        let mut config = AppConfig::default();
        config.chains.insert(
            "osmosis".to_string(),
            ChainConfig::new("osmosis-1", "osmo").with_rpc(Endpoint::new("rpc.osmosis.zone")),
        );
        config.chains.insert(
            "hub".to_string(),
            ChainConfig::new("cosmoshub-4", "cosmos"),
        );

        assert_eq!(config.chain("osmosis-1").unwrap().address_prefix, "osmo");
        assert!(config.chain("osmosis").is_none());

        let ids: Vec<_> = config
            .sorted_chains()
            .iter()
            .map(|chain| chain.chain_id.as_str())
            .collect();
        assert_eq!(ids, vec!["cosmoshub-4", "osmosis-1"]);
    }
}
