use cosmwasm_std::Uint128;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Amount of a single denomination
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Token denomination (e.g., "uusdc", "ibc/...")
    pub denom: String,

    /// Amount in base units
    pub amount: Uint128,
}

impl Coin {
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: Uint128::new(amount),
        }
    }

    /// Zero amount of the given denom. Used when a chain reports no balance.
    pub fn zero(denom: impl Into<String>) -> Self {
        Self::new(0, denom)
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}
