//! Transfer orchestration
//!
//! [`TransferOrchestrator`] composes an ICS-20 transfer (resolving addresses,
//! the route and a forward memo for multi-hop routes), hands it to a
//! [`Broadcaster`], then races a balance poller against a transfer event
//! subscription to confirm arrival. Only composing and broadcasting can fail
//! a transfer. Confirmation problems are reported on the [`TransferResult`].
//!
//! [`TransferResult`]: interchain_transfer_types::TransferResult

pub mod confirmation;
pub mod error;
pub mod ics20;
pub mod orchestrator;
pub mod scope;
pub mod traits;

pub use confirmation::{
    arrived, await_confirmation, Confirmation, ConfirmationConfig, ConfirmationTarget,
    DEFAULT_ARRIVAL_THRESHOLD_BPS, DEFAULT_CONFIRMATION_BUDGET, DEFAULT_POLL_INTERVAL,
};
pub use error::{BroadcastError, ConfirmationError, TransferError};
pub use ics20::{
    counterparty_chain, revision_number, Ics20MsgBuilder, MsgTransfer, MSG_TRANSFER_TYPE_URL,
};
pub use orchestrator::{
    BuilderError, ComposedTransfer, OrchestratorConfig, TransferOrchestrator,
    TransferOrchestratorBuilder, TransferStage,
};
pub use scope::{CancelScope, Cancelled};
pub use traits::{BroadcastOptions, Broadcaster, TransferMsgBuilder, TransferMsgParams};
