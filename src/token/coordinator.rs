//! Refresh Coordinator
//!
//! Single-flight access-token refresh shared by every request of a client.
//!
//! The coordinator is either idle or refreshing. The first request that fails
//! with a 401 while idle becomes the leader: it flips the state to refreshing
//! and runs the one refresh exchange. Any request that fails with a 401 while
//! a refresh is outstanding is parked on a oneshot channel in FIFO order.
//! When the exchange settles the state returns to idle and the queue is taken
//! in the same critical section, then every parked request is resolved with
//! the new token (and replays itself) or rejected with the exchange error.
//!
//! Each request takes part in at most one refresh cycle: the replay is sent
//! straight to the transport and its outcome, 401 included, is final.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::core::normalizer::RequestNormalizer;
use crate::core::transport::HttpTransport;
use crate::error::{ApiError, ApiResult};
use crate::telemetry::ClientMetrics;
use crate::token::exchange::RefreshExchange;
use crate::token::storage::{CredentialStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::types::{AccessToken, ApiResponse, RequestDescriptor};

type Settlement = Result<AccessToken, ApiError>;

/// A request waiting for the outcome of the in-flight refresh.
struct PendingRequest {
    settle: oneshot::Sender<Settlement>,
}

/// Refresh counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Refresh exchanges that produced a new access token.
    pub succeeded: u64,
    /// Refresh cycles that ended in failure (including abandoned ones).
    pub failed: u64,
    /// When the last successful refresh settled.
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct RefreshState {
    is_refreshing: bool,
    queue: VecDeque<PendingRequest>,
    stats: RefreshStats,
}

enum Role {
    Leader,
    Waiter(oneshot::Receiver<Settlement>),
}

/// Resets the state and settles the queue exactly once, even if the leading
/// future is dropped before the exchange completes.
struct SettleGuard<'a> {
    state: &'a Mutex<RefreshState>,
    abandoned_with: Option<ApiError>,
}

impl<'a> SettleGuard<'a> {
    fn new(state: &'a Mutex<RefreshState>, trigger: ApiError) -> Self {
        Self {
            state,
            abandoned_with: Some(trigger),
        }
    }

    fn settle(mut self, outcome: &Settlement) -> usize {
        self.abandoned_with = None;
        drain(self.state, outcome)
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if let Some(error) = self.abandoned_with.take() {
            warn!("Refresh abandoned before settling; rejecting queued requests");
            drain(self.state, &Err(error));
        }
    }
}

fn drain(state: &Mutex<RefreshState>, outcome: &Settlement) -> usize {
    let waiters = {
        let mut state = state.lock();
        state.is_refreshing = false;
        match outcome {
            Ok(_) => {
                state.stats.succeeded += 1;
                state.stats.last_refreshed_at = Some(Utc::now());
            }
            Err(_) => state.stats.failed += 1,
        }
        std::mem::take(&mut state.queue)
    };

    let count = waiters.len();
    for waiter in waiters {
        // A closed receiver means that caller went away; nothing to deliver.
        let _ = waiter.settle.send(outcome.clone());
    }
    count
}

/// Coordinates token refresh across concurrently failing requests.
pub struct RefreshCoordinator<T: HttpTransport, S: CredentialStore> {
    state: Mutex<RefreshState>,
    exchange: RwLock<Arc<dyn RefreshExchange>>,
    store: Arc<S>,
    normalizer: Arc<RequestNormalizer<S>>,
    transport: Arc<T>,
    metrics: RwLock<Arc<dyn ClientMetrics>>,
}

impl<T: HttpTransport, S: CredentialStore> RefreshCoordinator<T, S> {
    /// Create new coordinator.
    pub fn new(
        exchange: Arc<dyn RefreshExchange>,
        store: Arc<S>,
        normalizer: Arc<RequestNormalizer<S>>,
        transport: Arc<T>,
        metrics: Arc<dyn ClientMetrics>,
    ) -> Self {
        Self {
            state: Mutex::new(RefreshState::default()),
            exchange: RwLock::new(exchange),
            store,
            normalizer,
            transport,
            metrics: RwLock::new(metrics),
        }
    }

    /// Replace the refresh exchange. Takes effect from the next refresh cycle.
    pub fn set_exchange(&self, exchange: Arc<dyn RefreshExchange>) {
        *self.exchange.write() = exchange;
    }

    /// Replace the metrics sink.
    pub fn set_metrics(&self, metrics: Arc<dyn ClientMetrics>) {
        *self.metrics.write() = metrics;
    }

    /// Current metrics sink.
    pub fn metrics(&self) -> Arc<dyn ClientMetrics> {
        self.metrics.read().clone()
    }

    /// Whether a refresh exchange is outstanding.
    pub fn is_refreshing(&self) -> bool {
        self.state.lock().is_refreshing
    }

    /// Number of requests waiting on the outstanding refresh.
    pub fn pending_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Refresh counters.
    pub fn stats(&self) -> RefreshStats {
        self.state.lock().stats.clone()
    }

    /// Recover from a failed request.
    ///
    /// A 401 on a descriptor that neither skips auth nor has been retried
    /// starts or joins a refresh cycle and is replayed once with the new
    /// token. Every other error is returned unchanged.
    pub async fn handle_auth_failure(
        &self,
        mut descriptor: RequestDescriptor,
        error: ApiError,
    ) -> ApiResult<ApiResponse> {
        if !error.is_unauthorized() || !descriptor.is_refresh_eligible() {
            return Err(error);
        }

        descriptor.retried = true;

        match self.join_or_lead() {
            Role::Waiter(pending) => {
                let token = match pending.await {
                    Ok(settlement) => settlement?,
                    Err(_) => return Err(error),
                };
                self.replay(&descriptor, &token).await
            }
            Role::Leader => {
                info!(method = %descriptor.method, url = %descriptor.url, "Access token rejected; refreshing");

                let guard = SettleGuard::new(&self.state, error.clone());
                let outcome = self.refresh(&error).await;
                let settled = guard.settle(&outcome);
                self.metrics().record_refresh(outcome.is_ok());

                match outcome {
                    Ok(token) => {
                        info!(released = settled, "Token refresh succeeded");
                        self.replay(&descriptor, &token).await
                    }
                    Err(e) => {
                        warn!(status = e.status, rejected = settled, "Token refresh failed");
                        Err(e)
                    }
                }
            }
        }
    }

    /// Check-and-transition. Runs under one lock with no suspension point.
    fn join_or_lead(&self) -> Role {
        let mut state = self.state.lock();
        if !state.is_refreshing {
            state.is_refreshing = true;
            return Role::Leader;
        }

        let (settle, pending) = oneshot::channel();
        state.queue.push_back(PendingRequest { settle });
        let depth = state.queue.len();
        drop(state);

        debug!(queue_depth = depth, "Refresh in flight; request queued");
        self.metrics().record_request_queued(depth);
        Role::Waiter(pending)
    }

    async fn refresh(&self, trigger: &ApiError) -> Settlement {
        let refresh_token = match self.store.get(REFRESH_TOKEN_KEY).await? {
            Some(token) if !token.is_empty() => token,
            _ => {
                warn!("No refresh token stored; failing refresh without exchange");
                return Err(trigger.clone());
            }
        };

        let exchange = self.exchange.read().clone();
        let grant = exchange.exchange(&refresh_token).await?;

        self.store.set(ACCESS_TOKEN_KEY, &grant.access_token).await?;
        if let Some(rotated) = grant.refresh_token.as_deref() {
            self.store.set(REFRESH_TOKEN_KEY, rotated).await?;
        }

        Ok(AccessToken::new(grant.access_token))
    }

    async fn replay(
        &self,
        descriptor: &RequestDescriptor,
        token: &AccessToken,
    ) -> ApiResult<ApiResponse> {
        let request = self.normalizer.prepare_with_token(descriptor, Some(token))?;
        let result = self.transport.send(request).await;
        self.metrics().record_replay(result.is_ok());

        if let Err(e) = &result {
            debug!(status = e.status, url = %descriptor.url, "Replayed request failed");
        }
        result
    }
}
