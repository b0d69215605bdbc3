use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::{Coin, TxResponse};

/// A request to move funds from one chain to another
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub source_chain: String,
    pub dest_chain: String,

    /// Sender on the source chain. Empty means the registered signer.
    #[serde(default)]
    pub sender: String,

    /// Receiver on the destination chain. Replaced by the signer's own
    /// destination address unless the destination is the base chain.
    #[serde(default)]
    pub receiver: String,

    /// Amount leaving the source chain
    pub amount: Coin,

    /// Denom the funds arrive as on the destination (e.g., an ibc/ hash).
    /// Defaults to `amount.denom`.
    #[serde(default)]
    pub receive_denom: Option<String>,

    /// Blocks added to the current height of the timeout chain
    pub timeout_blocks: u64,

    #[serde(default)]
    pub fee: Option<Coin>,

    /// Pay fees from the fee-payer account instead of the signer
    #[serde(default)]
    pub use_fee_client: bool,

    /// Wrap the message in an authz exec
    #[serde(default)]
    pub wrap_authorized: bool,

    /// How long to wait for arrival. `None` uses the orchestrator default,
    /// zero skips confirmation.
    #[serde(default)]
    pub confirmation_budget: Option<Duration>,
}

impl TransferRequest {
    pub fn new(
        source_chain: impl Into<String>,
        dest_chain: impl Into<String>,
        amount: Coin,
        timeout_blocks: u64,
    ) -> Self {
        Self {
            source_chain: source_chain.into(),
            dest_chain: dest_chain.into(),
            sender: String::new(),
            receiver: String::new(),
            amount,
            receive_denom: None,
            timeout_blocks,
            fee: None,
            use_fee_client: false,
            wrap_authorized: false,
            confirmation_budget: None,
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    pub fn with_receiver(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = receiver.into();
        self
    }

    pub fn with_receive_denom(mut self, denom: impl Into<String>) -> Self {
        self.receive_denom = Some(denom.into());
        self
    }

    pub fn with_fee(mut self, fee: Coin) -> Self {
        self.fee = Some(fee);
        self
    }

    pub fn with_confirmation_budget(mut self, budget: Duration) -> Self {
        self.confirmation_budget = Some(budget);
        self
    }

    /// Denom expected to show up in the receiver's destination balance
    pub fn expected_denom(&self) -> &str {
        self.receive_denom
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(&self.amount.denom)
    }
}

/// Detector that observed a transfer's arrival
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Detector {
    Event,
    BalancePoll,
}

impl fmt::Display for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Detector::Event => write!(f, "event"),
            Detector::BalancePoll => write!(f, "balance_poll"),
        }
    }
}

/// What is known about a broadcast transfer's arrival
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ConfirmationStatus {
    /// Funds were observed on the destination chain
    Confirmed { by: Detector },
    /// Neither detector succeeded within the wait budget
    TimedOut,
    /// A detector failed or the wait was cancelled
    Failed { reason: String },
    /// The caller asked not to wait
    NotAwaited,
}

impl ConfirmationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationStatus::Confirmed { .. } => "confirmed",
            ConfirmationStatus::TimedOut => "timed_out",
            ConfirmationStatus::Failed { .. } => "failed",
            ConfirmationStatus::NotAwaited => "not_awaited",
        }
    }
}

/// Outcome of a transfer whose source transaction was broadcast
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferResult {
    pub source_tx_hash: String,
    pub dest_tx_hash: Option<String>,
    pub source_response: Option<TxResponse>,
    /// Raw payload of the destination event that confirmed arrival
    pub dest_response: Option<serde_json::Value>,
    /// Non-fatal confirmation error, if any
    pub error: Option<String>,
    pub confirmation: ConfirmationStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TransferResult {
    /// True when funds were observed arriving, false when only the source
    /// transaction is known to have succeeded
    pub fn is_confirmed(&self) -> bool {
        matches!(self.confirmation, ConfirmationStatus::Confirmed { .. })
    }
}
