//! Chain clients for interchain transfers
//!
//! [`ClientRegistry`] holds one entry per registered chain: its config, the
//! names of its signing keys, and an [`EndpointPool`] per transport. Pools
//! fail over across a chain's endpoints in order. The registry answers the
//! height, balance and signer queries the orchestrator needs and watches
//! destination chains for incoming transfers over websocket.

pub mod endpoint;
pub mod error;
pub mod events;
pub mod grpc;
pub mod keys;
pub mod proto;
pub mod registry;
pub mod rpc;
pub mod traits;

pub use endpoint::{Connector, EndpointPool, DEFAULT_REQUEST_TIMEOUT};
pub use error::ChainError;
pub use events::{recipient_query, SubscriptionGuard, TransferEvent};
pub use grpc::GrpcConnector;
pub use keys::{
    account_address, account_id, decode_address, encode_address, rebase_address, KeyBackend,
    MemoryKeyring,
};
pub use registry::{ClientRegistry, KeyHandle, SigningClient};
pub use rpc::{ChainRpc, RpcClient, RpcConnector, TendermintRpc};
pub use traits::{ChainQuerier, TransferEventSource};
