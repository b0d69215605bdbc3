//! Endpoint pools with circular failover
//!
//! A pool owns the ordered endpoint list for one chain and transport, keeps
//! exactly one endpoint active, and caches the client built against it.
//! Connect failures and retryable request failures advance the active
//! endpoint; each endpoint is tried at most once per call.

use async_trait::async_trait;
use interchain_transfer_metrics::TransferMetrics;
use interchain_transfer_types::{Endpoint, Transport};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::ChainError;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds transport clients of type `C` from endpoints
#[async_trait]
pub trait Connector<C>: Send + Sync {
    /// Check that an endpoint is well formed without touching the network
    fn validate(&self, endpoint: &Endpoint) -> Result<(), ChainError>;

    /// Build a client for `endpoint`, failing if it cannot be reached
    async fn connect(
        &self,
        chain_id: &str,
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<C, ChainError>;
}

struct PoolState<C> {
    current: usize,
    client: Option<C>,
    closed: bool,
}

/// Failover pool over one chain's endpoints for a single transport
pub struct EndpointPool<C> {
    chain_id: String,
    transport: Transport,
    endpoints: Vec<Endpoint>,
    connector: Arc<dyn Connector<C>>,
    request_timeout: Duration,
    state: Mutex<PoolState<C>>,
    metrics: TransferMetrics,
}

impl<C> EndpointPool<C>
where
    C: Clone + Send + 'static,
{
    /// Create a pool. Fails if `endpoints` is empty or any endpoint does
    /// not pass the connector's validation.
    pub fn new(
        chain_id: impl Into<String>,
        transport: Transport,
        endpoints: Vec<Endpoint>,
        connector: Arc<dyn Connector<C>>,
    ) -> Result<Self, ChainError> {
        let chain_id = chain_id.into();

        if endpoints.is_empty() {
            return Err(ChainError::NoEndpoints {
                chain_id,
                transport,
            });
        }

        for endpoint in &endpoints {
            connector.validate(endpoint)?;
        }

        tracing::debug!(
            chain_id = %chain_id,
            transport = %transport,
            endpoints = endpoints.len(),
            "Created endpoint pool"
        );

        Ok(Self {
            chain_id,
            transport,
            endpoints,
            connector,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            state: Mutex::new(PoolState {
                current: 0,
                client: None,
                closed: false,
            }),
            metrics: TransferMetrics::new(),
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// The currently active endpoint
    pub async fn current_endpoint(&self) -> Endpoint {
        let state = self.state.lock().await;
        self.endpoints[state.current].clone()
    }

    /// Client for the active endpoint, connecting (and failing over) if
    /// none is cached
    pub async fn get_client(&self) -> Result<C, ChainError> {
        self.checkout().await.map(|(_, client)| client)
    }

    /// Advance to the next endpoint and drop the cached client
    pub async fn failover(&self) {
        let mut state = self.state.lock().await;
        if !state.closed {
            self.advance(&mut state);
        }
    }

    /// Run `op` against the active client, failing over on retryable
    /// errors. Every endpoint is tried at most once.
    pub async fn with_failover<T, F, Fut>(&self, mut op: F) -> Result<T, ChainError>
    where
        F: FnMut(C) -> Fut,
        Fut: Future<Output = Result<T, ChainError>>,
    {
        let mut last_error = String::new();

        for _ in 0..self.endpoints.len() {
            let (index, client) = self.checkout().await?;

            match op(client).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    tracing::warn!(
                        chain_id = %self.chain_id,
                        transport = %self.transport,
                        endpoint = %self.endpoints[index].address,
                        error = %e,
                        "Request failed, failing over"
                    );
                    last_error = e.to_string();
                    self.failover_from(index).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(self.exhausted(last_error))
    }

    /// Drop the cached client and refuse further use. Idempotent.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if !state.closed {
            state.closed = true;
            state.client = None;
            tracing::debug!(
                chain_id = %self.chain_id,
                transport = %self.transport,
                "Closed endpoint pool"
            );
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    /// Active client together with the endpoint it was built against
    pub async fn get_client_and_endpoint(&self) -> Result<(Endpoint, C), ChainError> {
        let (index, client) = self.checkout().await?;
        Ok((self.endpoints[index].clone(), client))
    }

    /// Cached client, or a freshly dialed one. The lock is never held while
    /// dialing.
    async fn checkout(&self) -> Result<(usize, C), ChainError> {
        let mut last_error = String::new();

        for _ in 0..self.endpoints.len() {
            let index = {
                let state = self.state.lock().await;
                if state.closed {
                    return Err(self.closed());
                }
                if let Some(client) = &state.client {
                    return Ok((state.current, client.clone()));
                }
                state.current
            };

            let endpoint = &self.endpoints[index];
            match self
                .connector
                .connect(&self.chain_id, endpoint, self.request_timeout)
                .await
            {
                Ok(client) => {
                    let mut state = self.state.lock().await;
                    if state.closed {
                        return Err(self.closed());
                    }
                    if state.current != index {
                        // The pool moved on while dialing; use this client once
                        return Ok((index, client));
                    }
                    if let Some(cached) = &state.client {
                        return Ok((index, cached.clone()));
                    }

                    tracing::debug!(
                        chain_id = %self.chain_id,
                        transport = %self.transport,
                        endpoint = %endpoint.address,
                        "Connected"
                    );
                    state.client = Some(client.clone());
                    return Ok((index, client));
                }
                Err(e) => {
                    tracing::warn!(
                        chain_id = %self.chain_id,
                        transport = %self.transport,
                        endpoint = %endpoint.address,
                        error = %e,
                        "Connect failed"
                    );
                    last_error = e.to_string();
                    self.failover_from(index).await;
                }
            }
        }

        Err(self.exhausted(last_error))
    }

    /// Fail over only if no one else has moved the pool since `observed`
    async fn failover_from(&self, observed: usize) {
        let mut state = self.state.lock().await;
        if !state.closed && state.current == observed {
            self.advance(&mut state);
        }
    }

    fn advance(&self, state: &mut PoolState<C>) {
        let previous = state.current;
        state.current = (state.current + 1) % self.endpoints.len();
        state.client = None;

        self.metrics
            .record_endpoint_failover(&self.chain_id, self.transport);

        tracing::info!(
            chain_id = %self.chain_id,
            transport = %self.transport,
            from = %self.endpoints[previous].address,
            to = %self.endpoints[state.current].address,
            "Endpoint failover"
        );
    }

    fn closed(&self) -> ChainError {
        ChainError::PoolClosed {
            chain_id: self.chain_id.clone(),
            transport: self.transport,
        }
    }

    fn exhausted(&self, last_error: String) -> ChainError {
        self.metrics
            .record_endpoints_exhausted(&self.chain_id, self.transport);

        ChainError::EndpointsExhausted {
            chain_id: self.chain_id.clone(),
            transport: self.transport,
            attempts: self.endpoints.len(),
            last_error,
        }
    }
}
