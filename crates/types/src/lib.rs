pub mod asset;
pub mod chain;
pub mod route;
pub mod transfer;
pub mod tx;

pub use asset::*;
pub use chain::*;
pub use route::*;
pub use transfer::*;
pub use tx::*;

/// Port bound by the ICS-20 fungible token transfer module
pub const TRANSFER_PORT: &str = "transfer";
