use interchain_transfer_types::Transport;

/// Chain client error types
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("chain {0} is already registered")]
    ChainAlreadyRegistered(String),

    #[error("chain {0} is not registered")]
    ChainNotRegistered(String),

    #[error("no {transport} endpoints configured for {chain_id}")]
    NoEndpoints { chain_id: String, transport: Transport },

    #[error("invalid endpoint {address}: {reason}")]
    InvalidEndpoint { address: String, reason: String },

    #[error("all {attempts} {transport} endpoints failed for {chain_id}: {last_error}")]
    EndpointsExhausted {
        chain_id: String,
        transport: Transport,
        attempts: usize,
        last_error: String,
    },

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("{transport} pool for {chain_id} is closed")]
    PoolClosed { chain_id: String, transport: Transport },

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("address error: {0}")]
    Address(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("subscription error: {0}")]
    Subscription(String),
}

impl ChainError {
    /// Errors caused by what was configured rather than by the network
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ChainError::ChainAlreadyRegistered(_)
                | ChainError::ChainNotRegistered(_)
                | ChainError::NoEndpoints { .. }
                | ChainError::InvalidEndpoint { .. }
        )
    }

    /// Errors where no endpoint could be reached
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            ChainError::EndpointsExhausted { .. }
                | ChainError::ConnectionFailed(_)
                | ChainError::PoolClosed { .. }
                | ChainError::Timeout(_)
        )
    }

    /// Errors worth retrying against a different endpoint
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChainError::ConnectionFailed(_) | ChainError::Timeout(_) | ChainError::QueryFailed(_)
        )
    }
}
