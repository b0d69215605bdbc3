use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("route already registered: {source_chain} -> {dest_chain}")]
    DuplicateRoute {
        source_chain: String,
        dest_chain: String,
    },

    #[error("no route registered: {source_chain} -> {dest_chain}")]
    RouteNotFound {
        source_chain: String,
        dest_chain: String,
    },

    #[error("route is nil")]
    NilRoute,

    #[error("forward receiver address is empty")]
    EmptyForwardReceiver,

    #[error("memo encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl RoutingError {
    /// Errors caused by the route table contents rather than by message composition
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RoutingError::DuplicateRoute { .. } | RoutingError::RouteNotFound { .. }
        )
    }
}
