//! Transfer routes between chains and forward-memo construction for routes
//! that hop through an intermediate chain.

pub mod error;
pub mod memo;
pub mod registry;

pub use error::RoutingError;
pub use memo::{build_forward_route, ForwardMemo};
pub use registry::ConnectionRegistry;
