//! Operator claim session
//!
//! Owns the one authoritative "current lease" and the heartbeat loop.
//! Every entry point that changes the lease goes through here, which is
//! what enforces the stop-loop-before-start-loop invariant: heartbeat,
//! unlock and complete are never in flight concurrently for a lease.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::models::order::ClaimedOrder;
use crate::models::shipment::ShipmentMetadata;
use crate::services::claim::{ClaimError, ClaimOutcome, LeaseToken, PackQueue};

/// How long the best-effort teardown release may take before the task
/// gives up. Delivery is unverified either way; the server-side lease
/// timeout is the real cleanup.
const TEARDOWN_RELEASE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
struct ActiveLease {
    order_id: i64,
    lease: LeaseToken,
}

pub struct PackSession {
    queue: Arc<dyn PackQueue>,
    operator_id: String,
    heartbeat_interval: Duration,
    current: Option<ActiveLease>,
    heartbeat: Option<JoinHandle<()>>,
}

impl PackSession {
    pub fn new(queue: Arc<dyn PackQueue>, operator_id: &str, heartbeat_interval: Duration) -> Self {
        Self {
            queue,
            operator_id: operator_id.to_string(),
            heartbeat_interval,
            current: None,
            heartbeat: None,
        }
    }

    pub fn current_order_id(&self) -> Option<i64> {
        self.current.as_ref().map(|c| c.order_id)
    }

    pub fn has_lease(&self) -> bool {
        self.current.is_some()
    }

    /// Release any held lease bookkeeping and request the next order.
    ///
    /// Returns the claimed order, or `None` when the pool is empty. An
    /// empty pool leaves the session idle; the operator decides when to
    /// ask again.
    pub async fn claim_next(&mut self) -> Result<Option<ClaimedOrder>, ClaimError> {
        self.stop_heartbeat();
        let previous = self.current.take().map(|c| c.order_id);

        match self.queue.claim_next(&self.operator_id, previous).await? {
            ClaimOutcome::Claimed { order, lease } => {
                let order_id = order.order_id;
                self.current = Some(ActiveLease {
                    order_id,
                    lease: lease.clone(),
                });
                self.start_heartbeat(order_id, lease);
                tracing::info!(order_id, "order claimed");
                Ok(Some(order))
            }
            ClaimOutcome::Empty => {
                tracing::info!("no orders available to claim");
                Ok(None)
            }
        }
    }

    /// Operator-initiated skip: release the lease flagged as a skip so
    /// the same order does not come straight back. Release failures are
    /// logged, not fatal; the server lease timeout covers them.
    pub async fn skip(&mut self) {
        self.stop_heartbeat();
        if let Some(cur) = self.current.take() {
            if let Err(e) = self.queue.unlock(cur.order_id, &cur.lease, true).await {
                tracing::warn!(order_id = cur.order_id, error = %e, "skip unlock failed");
            } else {
                tracing::info!(order_id = cur.order_id, "order skipped");
            }
        }
    }

    /// Mark the claimed order fulfilled. The lease is released by the
    /// server as part of the call; no separate unlock follows. On error
    /// the lease is kept so the operator can retry or skip.
    pub async fn complete(&mut self, shipment: &ShipmentMetadata) -> Result<(), ClaimError> {
        self.stop_heartbeat();
        let cur = self.current.as_ref().ok_or(ClaimError::NoActiveLease)?;
        self.queue.complete(cur.order_id, &cur.lease, shipment).await?;
        tracing::info!(order_id = cur.order_id, "order completed");
        self.current = None;
        Ok(())
    }

    /// Best-effort release on shutdown or navigation away: a detached
    /// fire-and-forget task that outlives this session object. Delivery
    /// is not verified.
    pub fn release_on_teardown(&mut self) {
        self.stop_heartbeat();
        if let Some(cur) = self.current.take() {
            let queue = Arc::clone(&self.queue);
            tokio::spawn(async move {
                let release = queue.unlock(cur.order_id, &cur.lease, false);
                match tokio::time::timeout(TEARDOWN_RELEASE_TIMEOUT, release).await {
                    Ok(Ok(())) => tracing::debug!(order_id = cur.order_id, "teardown release sent"),
                    Ok(Err(e)) => {
                        tracing::debug!(order_id = cur.order_id, error = %e, "teardown release failed")
                    }
                    Err(_) => {
                        tracing::debug!(order_id = cur.order_id, "teardown release timed out")
                    }
                }
            });
        }
    }

    /// Spawn the renewal loop for a fresh lease. Any previous loop is
    /// stopped first; only one may ever run.
    fn start_heartbeat(&mut self, order_id: i64, lease: LeaseToken) {
        self.stop_heartbeat();

        let queue = Arc::clone(&self.queue);
        let interval = self.heartbeat_interval;
        self.heartbeat = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick resolves immediately; the claim itself
            // already proved liveness, so skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = queue.heartbeat(order_id, &lease).await {
                    // Renewal failures are non-fatal; the next tick or
                    // the server-side lease timeout is the safety net.
                    tracing::warn!(order_id, error = %e, "heartbeat failed");
                } else {
                    tracing::trace!(order_id, "lease renewed");
                }
            }
        }));
    }

    fn stop_heartbeat(&mut self) {
        if let Some(handle) = self.heartbeat.take() {
            handle.abort();
        }
    }
}

impl Drop for PackSession {
    fn drop(&mut self) {
        self.stop_heartbeat();
    }
}
