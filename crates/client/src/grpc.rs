use async_trait::async_trait;
use interchain_transfer_types::Endpoint;
use std::time::Duration;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint as TonicEndpoint};

use crate::endpoint::Connector;
use crate::ChainError;

/// Connector producing tonic gRPC channels
#[derive(Debug, Default, Clone, Copy)]
pub struct GrpcConnector;

impl GrpcConnector {
    fn tonic_endpoint(endpoint: &Endpoint) -> Result<TonicEndpoint, ChainError> {
        let invalid = |e: tonic::transport::Error| ChainError::InvalidEndpoint {
            address: endpoint.address.clone(),
            reason: e.to_string(),
        };

        let url = endpoint.grpc_url();
        let tonic_endpoint = TonicEndpoint::from_shared(url.clone()).map_err(invalid)?;

        if url.starts_with("https://") {
            tonic_endpoint
                .tls_config(ClientTlsConfig::new().with_webpki_roots())
                .map_err(invalid)
        } else {
            Ok(tonic_endpoint)
        }
    }
}

#[async_trait]
impl Connector<Channel> for GrpcConnector {
    fn validate(&self, endpoint: &Endpoint) -> Result<(), ChainError> {
        Self::tonic_endpoint(endpoint).map(|_| ())
    }

    async fn connect(
        &self,
        chain_id: &str,
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<Channel, ChainError> {
        let channel = Self::tonic_endpoint(endpoint)?
            .connect_timeout(timeout)
            .timeout(timeout)
            .connect()
            .await
            .map_err(|e| {
                ChainError::ConnectionFailed(format!(
                    "gRPC connect to {} failed: {}",
                    endpoint.grpc_url(),
                    e
                ))
            })?;

        tracing::debug!(
            chain_id = %chain_id,
            url = %endpoint.grpc_url(),
            "gRPC channel established"
        );

        Ok(channel)
    }
}
