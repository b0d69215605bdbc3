use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use interchain_transfer_types::{Forward, Transfer};

use crate::RoutingError;

/// Directed route table keyed by (source_chain, dest_chain).
///
/// Holds at most one route per ordered pair. A reverse path is a separate
/// entry and has to be registered on its own.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    routes: RwLock<HashMap<(String, String), Transfer>>,
}

impl ConnectionRegistry {
    /// Create an empty route table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from configured routes, rejecting duplicates
    pub fn from_routes(routes: impl IntoIterator<Item = Transfer>) -> Result<Self, RoutingError> {
        let registry = Self::new();
        for route in routes {
            registry.register_connection(route)?;
        }
        Ok(registry)
    }

    /// Create a table seeded with known mainnet routes
    pub fn with_mainnet_routes() -> Self {
        let registry = Self::new();
        for route in mainnet_routes() {
            // Seed pairs are unique
            let _ = registry.register_connection(route);
        }
        registry
    }

    /// Register a route. Fails if the ordered pair is already present, in
    /// which case the existing route is left untouched.
    pub fn register_connection(&self, route: Transfer) -> Result<(), RoutingError> {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        let key = route.key();

        if routes.contains_key(&key) {
            return Err(RoutingError::DuplicateRoute {
                source_chain: key.0,
                dest_chain: key.1,
            });
        }

        tracing::debug!(
            source_chain = %route.source_chain,
            dest_chain = %route.dest_chain,
            channel = %route.channel,
            hop_chain = route.forward.as_ref().map(|f| f.chain_id.as_str()).unwrap_or(""),
            "Registered route"
        );

        routes.insert(key, route);
        Ok(())
    }

    /// Look up the route for an exact ordered pair
    pub fn get_connection(&self, source_chain: &str, dest_chain: &str) -> Result<Transfer, RoutingError> {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        routes
            .get(&(source_chain.to_string(), dest_chain.to_string()))
            .cloned()
            .ok_or_else(|| RoutingError::RouteNotFound {
                source_chain: source_chain.to_string(),
                dest_chain: dest_chain.to_string(),
            })
    }

    /// Snapshot of every registered route
    pub fn get_all_connections(&self) -> Vec<Transfer> {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        routes.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.routes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn mainnet_routes() -> Vec<Transfer> {
    vec![
        // osmosis-1 <-> cosmoshub-4
        Transfer::direct("osmosis-1", "cosmoshub-4", "channel-0", "osmo", "cosmos"),
        Transfer::direct("cosmoshub-4", "osmosis-1", "channel-141", "cosmos", "osmo"),
        // osmosis-1 <-> neutron-1
        Transfer::direct("osmosis-1", "neutron-1", "channel-874", "osmo", "neutron"),
        Transfer::direct("neutron-1", "osmosis-1", "channel-10", "neutron", "osmo"),
        // neutron-1 <-> cosmoshub-4
        Transfer::direct("neutron-1", "cosmoshub-4", "channel-1", "neutron", "cosmos"),
        Transfer::direct("cosmoshub-4", "neutron-1", "channel-569", "cosmos", "neutron"),
        // noble-1 <-> osmosis-1
        Transfer::direct("noble-1", "osmosis-1", "channel-1", "noble", "osmo"),
        Transfer::direct("osmosis-1", "noble-1", "channel-750", "osmo", "noble"),
        // noble-1 <-> neutron-1
        Transfer::direct("noble-1", "neutron-1", "channel-18", "noble", "neutron"),
        Transfer::direct("neutron-1", "noble-1", "channel-30", "neutron", "noble"),
        // umee-1 <-> osmosis-1
        Transfer::direct("umee-1", "osmosis-1", "channel-0", "umee", "osmo"),
        Transfer::direct("osmosis-1", "umee-1", "channel-42", "osmo", "umee"),
        // stride-1 <-> osmosis-1
        Transfer::direct("stride-1", "osmosis-1", "channel-5", "stride", "osmo"),
        Transfer::direct("osmosis-1", "stride-1", "channel-326", "osmo", "stride"),
        // stride-1 <-> cosmoshub-4
        Transfer::direct("stride-1", "cosmoshub-4", "channel-0", "stride", "cosmos"),
        Transfer::direct("cosmoshub-4", "stride-1", "channel-391", "cosmos", "stride"),
        // neutron-1 -> cosmoshub-4 -> umee-1
        Transfer::direct("neutron-1", "umee-1", "channel-1", "neutron", "umee")
            .with_forward(Forward::new("cosmoshub-4", "channel-184")),
        // umee-1 -> cosmoshub-4 -> neutron-1
        Transfer::direct("umee-1", "neutron-1", "channel-1", "umee", "neutron")
            .with_forward(Forward::new("cosmoshub-4", "channel-569")),
        // noble-1 -> osmosis-1 -> umee-1
        Transfer::direct("noble-1", "umee-1", "channel-1", "noble", "umee")
            .with_forward(Forward::new("osmosis-1", "channel-42")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_register_and_get() {
        let registry = ConnectionRegistry::new();
        let route = Transfer::direct("osmosis-1", "neutron-1", "channel-874", "osmo", "neutron");
        registry.register_connection(route.clone()).unwrap();

        assert_eq!(registry.get_connection("osmosis-1", "neutron-1").unwrap(), route);
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let registry = ConnectionRegistry::new();
        let first = Transfer::direct("osmosis-1", "neutron-1", "channel-874", "osmo", "neutron");
        let second = Transfer::direct("osmosis-1", "neutron-1", "channel-999", "osmo", "neutron");

        registry.register_connection(first.clone()).unwrap();
        let err = registry.register_connection(second).unwrap_err();

        assert!(matches!(err, RoutingError::DuplicateRoute { .. }));
        assert!(err.is_configuration());
        assert_eq!(registry.get_connection("osmosis-1", "neutron-1").unwrap(), first);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_is_directed() {
        let registry = ConnectionRegistry::new();
        registry
            .register_connection(Transfer::direct(
                "osmosis-1",
                "neutron-1",
                "channel-874",
                "osmo",
                "neutron",
            ))
            .unwrap();

        let err = registry.get_connection("neutron-1", "osmosis-1").unwrap_err();
        assert!(matches!(err, RoutingError::RouteNotFound { .. }));
    }

    #[test]
    fn test_get_all_connections_is_snapshot() {
        let registry = ConnectionRegistry::new();
        registry
            .register_connection(Transfer::direct("a-1", "b-1", "channel-0", "a", "b"))
            .unwrap();

        let mut snapshot = registry.get_all_connections();
        snapshot[0].channel = "channel-mutated".to_string();
        snapshot.clear();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_connection("a-1", "b-1").unwrap().channel, "channel-0");
    }

    #[test]
    fn test_from_routes_rejects_duplicates() {
        let routes = vec![
            Transfer::direct("a-1", "b-1", "channel-0", "a", "b"),
            Transfer::direct("a-1", "b-1", "channel-1", "a", "b"),
        ];
        assert!(ConnectionRegistry::from_routes(routes).is_err());
    }

    #[test]
    fn test_mainnet_seed() {
        let registry = ConnectionRegistry::with_mainnet_routes();
        assert_eq!(registry.len(), mainnet_routes().len());

        let hop = registry.get_connection("neutron-1", "umee-1").unwrap();
        let forward = hop.forward.expect("neutron -> umee hops through the hub");
        assert_eq!(forward.chain_id, "cosmoshub-4");
        assert!(forward.receiver.is_empty());

        let direct = registry.get_connection("osmosis-1", "neutron-1").unwrap();
        assert!(direct.forward.is_none());
    }

    #[test]
    fn test_concurrent_reads() {
        let registry = Arc::new(ConnectionRegistry::with_mainnet_routes());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.get_connection("noble-1", "osmosis-1").is_ok())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
