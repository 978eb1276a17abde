//! Single-flight credential refresh.
//!
//! Any number of callers can observe an expired access credential at the
//! same time; exactly one refresh call reaches the server. The first
//! observer performs the refresh while every later one parks as a waiter
//! and is released, in registration order, only after the replacement
//! credentials are durably stored. When refresh itself fails the session is
//! torn down and parked waiters resolve to a terminal error.

use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, warn};

use super::auth::refresh_session_impl;
use super::config::ClientConfig;
use super::errors::{RequestError, RequestResult};
use super::session::SessionStore;
use super::sign_out::SessionTerminator;
use super::transport::SharedTransport;

/// Host-surface hook invoked when a refresh fails, before navigation.
#[cfg(not(target_arch = "wasm32"))]
pub type FailureCallback = Box<dyn Fn() + Send + Sync>;
#[cfg(target_arch = "wasm32")]
pub type FailureCallback = Box<dyn Fn()>;

/// In-memory refresh bookkeeping. `in_flight` is true exactly while a
/// refresh call is outstanding; `waiters` is non-empty only then. Emptied
/// again the moment a refresh settles, success or failure.
#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<String>>,
}

/// Owns the refresh state machine. Constructed once per application session
/// and shared by reference; there is deliberately no global instance.
pub struct RefreshCoordinator {
    store: Arc<SessionStore>,
    transport: SharedTransport,
    config: Arc<ClientConfig>,
    terminator: Arc<SessionTerminator>,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<SessionStore>,
        transport: SharedTransport,
        config: Arc<ClientConfig>,
        terminator: Arc<SessionTerminator>,
    ) -> Self {
        Self {
            store,
            transport,
            config,
            terminator,
            state: Mutex::new(RefreshState::default()),
        }
    }

    /// Obtain an access token that is at least as new as the one that just
    /// failed: either by performing the refresh or by waiting on the one
    /// already in flight.
    pub async fn fresh_access_token(&self) -> RequestResult<String> {
        self.fresh_access_token_with_hook(None).await
    }

    /// Same as [`fresh_access_token`](Self::fresh_access_token), with an
    /// optional hook run after a failed refresh has cleared the store but
    /// before navigation to the sign-in boundary.
    pub(crate) async fn fresh_access_token_with_hook(
        &self,
        on_failure: Option<&FailureCallback>,
    ) -> RequestResult<String> {
        // The in_flight check and flip happen under one lock acquisition
        // with no await in between; two callers can never both become the
        // refresher.
        let waiter = {
            let mut state = self.state.lock().await;
            if state.in_flight {
                let (sender, receiver) = oneshot::channel();
                state.waiters.push(sender);
                Some(receiver)
            } else {
                state.in_flight = true;
                None
            }
        };

        if let Some(receiver) = waiter {
            debug!("refresh already in flight, waiting for it to settle");
            return receiver
                .await
                .map_err(|_| RequestError::SessionTerminated);
        }

        self.run_refresh(on_failure).await
    }

    /// The refresher's path: exactly one execution of this is active at a
    /// time.
    async fn run_refresh(&self, on_failure: Option<&FailureCallback>) -> RequestResult<String> {
        let current = match self.store.load() {
            Some(credentials) if !credentials.refresh_token.is_empty() => credentials,
            _ => {
                // nothing to refresh with
                warn!("no refresh credential available, ending session");
                self.settle_failure(on_failure).await;
                return Err(RequestError::SessionTerminated);
            }
        };

        match refresh_session_impl(&self.transport, &self.config, &current).await {
            Ok((credentials, ttl_seconds)) => {
                // The store is written before any waiter is released, so
                // every released waiter observes the new credential.
                if let Err(err) = self.store.save(&credentials, ttl_seconds) {
                    error!("failed to persist refreshed credentials: {}", err);
                    self.settle_failure(on_failure).await;
                    return Err(RequestError::SessionTerminated);
                }

                let access_token = credentials.access_token;
                let waiters = {
                    let mut state = self.state.lock().await;
                    state.in_flight = false;
                    std::mem::take(&mut state.waiters)
                };

                if !waiters.is_empty() {
                    info!(count = waiters.len(), "releasing parked requests");
                }
                for sender in waiters {
                    // registration order is release order
                    let _ = sender.send(access_token.clone());
                }

                Ok(access_token)
            }
            Err(err) => {
                error!("session refresh failed: {}", err);
                self.settle_failure(on_failure).await;
                Err(RequestError::SessionTerminated)
            }
        }
    }

    /// Failure path: collapse the state machine back to idle, wipe the
    /// store, give the host a chance to react, then terminate the session.
    /// Dropped waiter channels resolve the parked callers terminally.
    async fn settle_failure(&self, on_failure: Option<&FailureCallback>) {
        let waiters = {
            let mut state = self.state.lock().await;
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        if !waiters.is_empty() {
            warn!(count = waiters.len(), "abandoning parked requests");
        }
        drop(waiters);

        self.store.clear();
        if let Some(callback) = on_failure {
            callback();
        }
        self.terminator.terminate();
    }
}
