//! Arrival confirmation
//!
//! Two detectors race for the answer. A balance poller compares the
//! receiver's destination balance against a baseline taken before the wait,
//! and an event watcher subscribes to transfer events for the receiver. The
//! first success wins. Both tasks are aborted when the race ends.

use cosmwasm_std::Uint128;
use interchain_transfer_client::{ChainError, ChainQuerier, TransferEvent, TransferEventSource};
use interchain_transfer_metrics::TransferMetrics;
use interchain_transfer_types::{Coin, Detector};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::ConfirmationError;
use crate::scope::CancelScope;

/// Default wait for a transfer to land
pub const DEFAULT_CONFIRMATION_BUDGET: Duration = Duration::from_secs(6 * 60);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Share of the expected amount (in basis points) that counts as arrived.
/// Forwarding and relaying fees eat into the rest.
pub const DEFAULT_ARRIVAL_THRESHOLD_BPS: u32 = 9_500;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmationConfig {
    pub budget: Duration,
    pub poll_interval: Duration,
    pub threshold_bps: u32,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            budget: DEFAULT_CONFIRMATION_BUDGET,
            poll_interval: DEFAULT_POLL_INTERVAL,
            threshold_bps: DEFAULT_ARRIVAL_THRESHOLD_BPS,
        }
    }
}

impl ConfirmationConfig {
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Where the funds should show up
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmationTarget {
    pub chain_id: String,
    pub receiver: String,
    /// Amount and denom expected on the destination
    pub expected: Coin,
}

/// Successful confirmation
#[derive(Clone, Debug)]
pub struct Confirmation {
    pub detector: Detector,
    /// Set when the event watcher won
    pub event: Option<TransferEvent>,
    pub elapsed: Duration,
}

/// True once `gained` reaches `threshold_bps` of `expected`
pub fn arrived(gained: Uint128, expected: Uint128, threshold_bps: u32) -> bool {
    gained.full_mul(10_000u128) >= expected.full_mul(threshold_bps)
}

enum DetectorReport {
    Event(Result<TransferEvent, ChainError>),
    Poll(Result<(), ConfirmationError>),
}

/// Aborts the task when dropped
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Wait until `target` observes the transfer, the budget runs out, or
/// `scope` is cancelled
pub async fn await_confirmation(
    querier: Arc<dyn ChainQuerier>,
    events: Arc<dyn TransferEventSource>,
    scope: &CancelScope,
    target: ConfirmationTarget,
    config: &ConfirmationConfig,
) -> Result<Confirmation, ConfirmationError> {
    if config.poll_interval.is_zero() {
        return Err(ConfirmationError::ZeroPollInterval);
    }

    let started = Instant::now();
    let scope = scope.child();
    let (reports, mut received) = mpsc::channel(2);

    debug!(
        chain_id = %target.chain_id,
        receiver = %target.receiver,
        expected = %target.expected,
        budget = ?config.budget,
        "Awaiting transfer arrival"
    );

    let poller = AbortOnDrop(tokio::spawn(poll_balance(
        querier,
        scope.clone(),
        target.clone(),
        config.clone(),
        reports.clone(),
    )));
    let watcher = AbortOnDrop(tokio::spawn(watch_events(events, target.clone(), reports)));

    let race = async {
        loop {
            tokio::select! {
                biased;
                _ = scope.cancelled() => return Err(ConfirmationError::Cancelled),
                report = received.recv() => match report {
                    Some(DetectorReport::Event(Ok(event))) => {
                        return Ok((Detector::Event, Some(event)));
                    }
                    Some(DetectorReport::Event(Err(err))) => {
                        warn!(
                            chain_id = %target.chain_id,
                            error = %err,
                            "Event watcher failed, continuing with balance polling"
                        );
                        TransferMetrics::new().record_event_watcher_error(&target.chain_id);
                    }
                    Some(DetectorReport::Poll(Ok(()))) => return Ok((Detector::BalancePoll, None)),
                    Some(DetectorReport::Poll(Err(err))) => return Err(err),
                    None => return Err(ConfirmationError::DetectorsExhausted),
                },
            }
        }
    };

    let outcome = match tokio::time::timeout(config.budget, race).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ConfirmationError::TimedOut(config.budget)),
    };

    scope.cancel();
    drop(poller);
    drop(watcher);

    let elapsed = started.elapsed();
    let (detector, event) = outcome?;
    info!(
        chain_id = %target.chain_id,
        receiver = %target.receiver,
        detector = %detector,
        elapsed_ms = elapsed.as_millis() as u64,
        "Transfer arrival confirmed"
    );

    Ok(Confirmation {
        detector,
        event,
        elapsed,
    })
}

async fn poll_balance(
    querier: Arc<dyn ChainQuerier>,
    scope: CancelScope,
    target: ConfirmationTarget,
    config: ConfirmationConfig,
    reports: mpsc::Sender<DetectorReport>,
) {
    let result = poll_until_arrived(querier.as_ref(), &scope, &target, &config).await;
    let _ = reports.send(DetectorReport::Poll(result)).await;
}

async fn poll_until_arrived(
    querier: &dyn ChainQuerier,
    scope: &CancelScope,
    target: &ConfirmationTarget,
    config: &ConfirmationConfig,
) -> Result<(), ConfirmationError> {
    let denom = target.expected.denom.as_str();
    let baseline = scope
        .run(querier.balance(&target.chain_id, &target.receiver, denom))
        .await?
        .map_err(ConfirmationError::BaselineQuery)?;

    debug!(
        chain_id = %target.chain_id,
        receiver = %target.receiver,
        baseline = %baseline,
        "Recorded baseline balance"
    );

    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        scope.run(ticker.tick()).await?;

        let current = scope
            .run(querier.balance(&target.chain_id, &target.receiver, denom))
            .await?
            .map_err(ConfirmationError::PollQuery)?;

        let gained = current.amount.saturating_sub(baseline.amount);
        if arrived(gained, target.expected.amount, config.threshold_bps) {
            return Ok(());
        }

        debug!(
            chain_id = %target.chain_id,
            gained = %gained,
            expected = %target.expected.amount,
            "Transfer not arrived yet"
        );
    }
}

async fn watch_events(
    events: Arc<dyn TransferEventSource>,
    target: ConfirmationTarget,
    reports: mpsc::Sender<DetectorReport>,
) {
    let result = events
        .wait_for_transfer(&target.chain_id, &target.receiver)
        .await;
    let _ = reports.send(DetectorReport::Event(result)).await;
}
