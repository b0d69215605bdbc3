use interchain_transfer_client::ChainError;
use interchain_transfer_routing::RoutingError;
use std::time::Duration;
use thiserror::Error;

use crate::scope::Cancelled;

/// Errors that fail a transfer call. Any of these means the transfer did
/// not happen or its message could not be built.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("connectivity error: {0}")]
    Connectivity(String),

    #[error("composition error: {0}")]
    Composition(String),

    #[error("broadcast on {chain_id} failed: {reason}")]
    Broadcast { chain_id: String, reason: String },

    #[error("transfer cancelled")]
    Cancelled,
}

impl From<RoutingError> for TransferError {
    fn from(err: RoutingError) -> Self {
        if err.is_configuration() {
            TransferError::Configuration(err.to_string())
        } else {
            TransferError::Composition(err.to_string())
        }
    }
}

impl From<ChainError> for TransferError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::ChainAlreadyRegistered(_)
            | ChainError::ChainNotRegistered(_)
            | ChainError::NoEndpoints { .. }
            | ChainError::InvalidEndpoint { .. }
            | ChainError::KeyNotFound(_) => TransferError::Configuration(err.to_string()),
            ChainError::EndpointsExhausted { .. }
            | ChainError::ConnectionFailed(_)
            | ChainError::PoolClosed { .. }
            | ChainError::Timeout(_)
            | ChainError::QueryFailed(_)
            | ChainError::Subscription(_) => TransferError::Connectivity(err.to_string()),
            ChainError::Address(_) | ChainError::Encoding(_) => {
                TransferError::Composition(err.to_string())
            }
        }
    }
}

impl From<Cancelled> for TransferError {
    fn from(_: Cancelled) -> Self {
        TransferError::Cancelled
    }
}

/// Why arrival could not be confirmed. Never fails a transfer whose source
/// transaction was broadcast.
#[derive(Debug, Error)]
pub enum ConfirmationError {
    #[error("no confirmation within {0:?}")]
    TimedOut(Duration),

    #[error("baseline balance query failed: {0}")]
    BaselineQuery(#[source] ChainError),

    #[error("balance poll failed: {0}")]
    PollQuery(#[source] ChainError),

    #[error("confirmation cancelled")]
    Cancelled,

    #[error("every detector stopped without a result")]
    DetectorsExhausted,

    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,
}

impl From<Cancelled> for ConfirmationError {
    fn from(_: Cancelled) -> Self {
        ConfirmationError::Cancelled
    }
}

/// Failure reported by a [`crate::Broadcaster`]
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("signing failed: {0}")]
    Signing(String),

    #[error("broadcast rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}
