//! Hand-written prost messages for the few Cosmos SDK types used here

use cosmwasm_std::Uint128;
use interchain_transfer_types::Coin;
use std::str::FromStr;

use crate::ChainError;

/// ABCI path of the bank balance query
pub const BANK_BALANCE_PATH: &str = "/cosmos.bank.v1beta1.Query/Balance";

/// `cosmos.base.v1beta1.Coin`
#[derive(Clone, PartialEq, prost::Message)]
pub struct ProtoCoin {
    #[prost(string, tag = "1")]
    pub denom: String,
    #[prost(string, tag = "2")]
    pub amount: String,
}

impl From<&Coin> for ProtoCoin {
    fn from(coin: &Coin) -> Self {
        Self {
            denom: coin.denom.clone(),
            amount: coin.amount.to_string(),
        }
    }
}

impl TryFrom<ProtoCoin> for Coin {
    type Error = ChainError;

    fn try_from(coin: ProtoCoin) -> Result<Self, Self::Error> {
        let amount = if coin.amount.is_empty() {
            Uint128::zero()
        } else {
            Uint128::from_str(&coin.amount).map_err(|e| {
                ChainError::Encoding(format!("invalid coin amount {:?}: {}", coin.amount, e))
            })?
        };
        Ok(Coin {
            denom: coin.denom,
            amount,
        })
    }
}

/// `cosmos.bank.v1beta1.QueryBalanceRequest`
#[derive(Clone, PartialEq, prost::Message)]
pub struct QueryBalanceRequest {
    #[prost(string, tag = "1")]
    pub address: String,
    #[prost(string, tag = "2")]
    pub denom: String,
}

/// `cosmos.bank.v1beta1.QueryBalanceResponse`
#[derive(Clone, PartialEq, prost::Message)]
pub struct QueryBalanceResponse {
    #[prost(message, optional, tag = "1")]
    pub balance: Option<ProtoCoin>,
}
