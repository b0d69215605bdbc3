//! Configuration validation

use crate::{AppConfig, ConfigError, Result};
use interchain_transfer_types::{ChainConfig, Endpoint, Transfer};
use std::collections::{HashMap, HashSet};

/// Validation error details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the entire application configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let errors = validation_errors(config);

    // Return all errors if any were found
    if !errors.is_empty() {
        let error_msg = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ConfigError::ValidationError(error_msg));
    }

    Ok(())
}

/// Every problem found in `config`
pub fn validation_errors(config: &AppConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    // Validate network config
    if let Err(e) = validate_log_level(&config.network.log_level) {
        errors.push(e);
    }

    // Validate chains
    let mut names_by_id: HashMap<&str, &str> = HashMap::new();
    let mut names: Vec<_> = config.chains.keys().collect();
    names.sort();
    for chain_name in names {
        let chain_config = &config.chains[chain_name];
        if let Err(e) = validate_chain_config(chain_config) {
            errors.push(ValidationError::new(format!("chains.{chain_name}"), e));
        }

        if let Some(other) = names_by_id.insert(&chain_config.chain_id, chain_name) {
            errors.push(ValidationError::new(
                format!("chains.{chain_name}.chain_id"),
                format!(
                    "chain '{}' is also configured as '{other}'",
                    chain_config.chain_id
                ),
            ));
        }
    }

    // Validate routes
    let mut route_keys = HashSet::new();
    for (idx, route) in config.routes.iter().enumerate() {
        if let Err(e) = validate_route(route) {
            errors.push(ValidationError::new(format!("routes[{idx}]"), e));
        }

        if !route_keys.insert(route.key()) {
            errors.push(ValidationError::new(
                format!("routes[{idx}]"),
                format!(
                    "duplicate route {} -> {}",
                    route.source_chain, route.dest_chain
                ),
            ));
        }

        if !config.orchestrator.seed_mainnet_routes {
            for chain_id in route_chains(route) {
                if config.chain(chain_id).is_none() {
                    errors.push(ValidationError::new(
                        format!("routes[{idx}]"),
                        format!("chain '{chain_id}' not found in chains config"),
                    ));
                }
            }
        }
    }

    // Validate signer
    if config.signer.key_name.is_empty() {
        errors.push(ValidationError::new(
            "signer.key_name",
            "key name is required",
        ));
    }

    if config.signer.fee_key_name.as_deref() == Some("") {
        errors.push(ValidationError::new(
            "signer.fee_key_name",
            "fee key name cannot be empty when set",
        ));
    }

    // Validate orchestrator config
    let orchestrator = &config.orchestrator;
    if orchestrator.base_chain.is_empty() {
        errors.push(ValidationError::new(
            "orchestrator.base_chain",
            "base chain is required",
        ));
    } else if config.chain(&orchestrator.base_chain).is_none() {
        errors.push(ValidationError::new(
            "orchestrator.base_chain",
            format!(
                "chain '{}' not found in chains config",
                orchestrator.base_chain
            ),
        ));
    }

    if orchestrator.poll_interval_secs == 0 {
        errors.push(ValidationError::new(
            "orchestrator.poll_interval_secs",
            "must be greater than 0",
        ));
    }

    if orchestrator.arrival_threshold_bps == 0 || orchestrator.arrival_threshold_bps > 10_000 {
        errors.push(ValidationError::new(
            "orchestrator.arrival_threshold_bps",
            "must be between 1 and 10000 (100%)",
        ));
    }

    errors
}

/// Validate a chain configuration
pub fn validate_chain_config(chain: &ChainConfig) -> std::result::Result<(), String> {
    if chain.chain_id.is_empty() {
        return Err("chain_id is required".to_string());
    }

    if chain.address_prefix.is_empty() {
        return Err("address_prefix is required".to_string());
    }

    if chain.rpc_endpoints.is_empty() {
        return Err("at least one rpc endpoint is required".to_string());
    }

    for endpoint in chain.rpc_endpoints.iter().chain(&chain.grpc_endpoints) {
        validate_endpoint(endpoint)?;
    }

    if chain.request_timeout_ms == 0 {
        return Err("request_timeout_ms must be greater than 0".to_string());
    }

    Ok(())
}

/// Validate an endpoint address. Scheme-less addresses take their scheme
/// from `use_tls`.
pub fn validate_endpoint(endpoint: &Endpoint) -> std::result::Result<(), String> {
    if endpoint.address.trim().is_empty() {
        return Err("endpoint address cannot be empty".to_string());
    }

    if endpoint.address.contains("://") {
        validate_url(&endpoint.address)?;
    }

    Ok(())
}

/// Validate a route definition
pub fn validate_route(route: &Transfer) -> std::result::Result<(), String> {
    if route.source_chain.is_empty() || route.dest_chain.is_empty() {
        return Err("source_chain and dest_chain are required".to_string());
    }

    if route.source_chain == route.dest_chain {
        return Err("source_chain and dest_chain must differ".to_string());
    }

    validate_channel(&route.channel)?;

    if route.source_prefix.is_empty() || route.dest_prefix.is_empty() {
        return Err("source_prefix and dest_prefix are required".to_string());
    }

    if let Some(forward) = &route.forward {
        if forward.chain_id.is_empty() {
            return Err("forward.chain_id is required".to_string());
        }
        if forward.chain_id == route.source_chain || forward.chain_id == route.dest_chain {
            return Err("forward.chain_id must be an intermediate chain".to_string());
        }
        validate_channel(&forward.channel)?;
    }

    Ok(())
}

fn validate_channel(channel: &str) -> std::result::Result<(), String> {
    match channel.strip_prefix("channel-") {
        Some(number) if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) => {
            Ok(())
        }
        _ => Err(format!("invalid channel '{channel}', expected channel-<n>")),
    }
}

fn route_chains(route: &Transfer) -> Vec<&str> {
    let mut chains = vec![route.source_chain.as_str(), route.dest_chain.as_str()];
    if let Some(forward) = &route.forward {
        chains.push(&forward.chain_id);
    }
    chains
}

/// Validate a URL
pub fn validate_url(url: &str) -> std::result::Result<(), String> {
    if url.is_empty() {
        return Err("URL cannot be empty".to_string());
    }

    // Basic URL validation - check for scheme
    if !url.starts_with("http://")
        && !url.starts_with("https://")
        && !url.starts_with("ws://")
        && !url.starts_with("wss://")
    {
        return Err("URL must start with http://, https://, ws://, or wss://".to_string());
    }

    Ok(())
}

/// Validate log level
fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new(
            "network.log_level",
            format!(
                "invalid log level '{level}', must be one of: trace, debug, info, warn, error"
            ),
        )),
    }
}
