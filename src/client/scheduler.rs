//! Proactive credential refresh.
//!
//! A background loop that refreshes shortly before the stored expiration
//! instant instead of waiting for a request to fail. It drives the same
//! coordinator as the reactive path, so a scheduler tick and a concurrent
//! 401 collapse into one refresh call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::config::ClientConfig;
use super::errors::RequestError;
use super::session::SessionStore;
use super::session_refresh::{FailureCallback, RefreshCoordinator};
use super::types::current_time_millis;
use crate::utils;

/// Deactivation handle for a running scheduler. Stopping is idempotent and
/// only suppresses future ticks; a check already in progress finishes.
#[derive(Clone)]
pub struct SchedulerHandle {
    stopped: Arc<AtomicBool>,
}

impl SchedulerHandle {
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            info!("proactive refresh scheduler stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Start the recurring check. Runs once immediately, then on every tick
/// until the returned handle is stopped.
pub fn start(
    coordinator: Arc<RefreshCoordinator>,
    store: Arc<SessionStore>,
    config: Arc<ClientConfig>,
    on_failure: Option<FailureCallback>,
) -> SchedulerHandle {
    let stopped = Arc::new(AtomicBool::new(false));
    let handle = SchedulerHandle {
        stopped: stopped.clone(),
    };

    let interval = Duration::from_secs(config.scheduler_interval_secs.max(1));
    let buffer_secs = config.refresh_buffer_secs;

    utils::spawn(async move {
        loop {
            if stopped.load(Ordering::SeqCst) {
                break;
            }
            check_once(&coordinator, &store, buffer_secs, on_failure.as_ref()).await;
            utils::sleep(interval).await;
        }
        debug!("proactive refresh loop exited");
    });

    handle
}

/// One scheduler check. Returns whether a refresh was attempted.
///
/// A missing expiration record is treated as expiring immediately; the
/// scheduler only runs for signed-in sessions, so the conservative reading
/// is the safe one.
pub(crate) async fn check_once(
    coordinator: &RefreshCoordinator,
    store: &SessionStore,
    buffer_secs: u64,
    on_failure: Option<&FailureCallback>,
) -> bool {
    let due = match store.stored_expiry() {
        None => true,
        Some(expires_at) => current_time_millis() + buffer_secs * 1000 >= expires_at,
    };
    if !due {
        return false;
    }

    debug!("credential inside refresh window, refreshing proactively");
    match coordinator.fresh_access_token_with_hook(on_failure).await {
        Ok(_) => {}
        Err(RequestError::SessionTerminated) => {
            warn!("proactive refresh ended the session");
        }
        Err(err) => {
            warn!("proactive refresh failed: {}", err);
        }
    }
    true
}
