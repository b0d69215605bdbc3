//! Default ICS-20 `MsgTransfer` encoding

use interchain_transfer_client::proto::ProtoCoin;
use interchain_transfer_types::{CosmosMsg, Transfer};
use prost::Message;

use crate::error::TransferError;
use crate::traits::{TransferMsgBuilder, TransferMsgParams};

pub const MSG_TRANSFER_TYPE_URL: &str = "/ibc.applications.transfer.v1.MsgTransfer";

/// `ibc.core.client.v1.Height`
#[derive(Clone, PartialEq, prost::Message)]
pub struct Height {
    #[prost(uint64, tag = "1")]
    pub revision_number: u64,
    #[prost(uint64, tag = "2")]
    pub revision_height: u64,
}

/// `ibc.applications.transfer.v1.MsgTransfer`
#[derive(Clone, PartialEq, prost::Message)]
pub struct MsgTransfer {
    #[prost(string, tag = "1")]
    pub source_port: String,
    #[prost(string, tag = "2")]
    pub source_channel: String,
    #[prost(message, optional, tag = "3")]
    pub token: Option<ProtoCoin>,
    #[prost(string, tag = "4")]
    pub sender: String,
    #[prost(string, tag = "5")]
    pub receiver: String,
    #[prost(message, optional, tag = "6")]
    pub timeout_height: Option<Height>,
    #[prost(uint64, tag = "7")]
    pub timeout_timestamp: u64,
    #[prost(string, tag = "8")]
    pub memo: String,
}

/// Revision number encoded in an IBC chain id (`osmosis-1` is revision 1).
/// Ids without a `-<n>` suffix are revision 0.
pub fn revision_number(chain_id: &str) -> u64 {
    let Some((name, revision)) = chain_id.rsplit_once('-') else {
        return 0;
    };
    if name.is_empty() || revision.starts_with('0') {
        return 0;
    }
    revision.parse().unwrap_or(0)
}

/// Chain that receives the first packet and so judges its timeout height:
/// the hop chain on forwarding routes, otherwise the destination
pub fn counterparty_chain(route: &Transfer) -> &str {
    route
        .forward
        .as_ref()
        .map(|forward| forward.chain_id.as_str())
        .unwrap_or(&route.dest_chain)
}

/// Encodes transfers as height-bounded ICS-20 `MsgTransfer`s
#[derive(Debug, Default, Clone, Copy)]
pub struct Ics20MsgBuilder;

impl TransferMsgBuilder for Ics20MsgBuilder {
    fn build(&self, params: &TransferMsgParams) -> Result<CosmosMsg, TransferError> {
        if params.sender.is_empty() {
            return Err(TransferError::Composition("sender is empty".to_string()));
        }
        if params.receiver.is_empty() {
            return Err(TransferError::Composition("receiver is empty".to_string()));
        }
        if params.amount.is_zero() {
            return Err(TransferError::Composition(format!(
                "cannot transfer zero {}",
                params.amount.denom
            )));
        }

        let msg = MsgTransfer {
            source_port: params.route.port.clone(),
            source_channel: params.route.channel.clone(),
            token: Some(ProtoCoin::from(&params.amount)),
            sender: params.sender.clone(),
            receiver: params.receiver.clone(),
            timeout_height: Some(Height {
                revision_number: revision_number(counterparty_chain(&params.route)),
                revision_height: params.timeout_height,
            }),
            timeout_timestamp: 0,
            memo: params.memo.clone(),
        };

        Ok(CosmosMsg::new(MSG_TRANSFER_TYPE_URL, msg.encode_to_vec()))
    }
}
