//! Session teardown.
//!
//! The one-way exit from an authenticated session: wipe the credential
//! store, then hand control to the sign-in boundary. Reached from explicit
//! sign-out and from every irrecoverable refresh failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use super::session::SessionStore;

/// Where users land when the session ends.
pub trait LoginBoundary: Send + Sync {
    fn redirect_to_sign_in(&self);
}

/// Browser boundary: full-page navigation to the sign-in route.
#[cfg(target_arch = "wasm32")]
pub struct BrowserBoundary {
    sign_in_path: String,
}

#[cfg(target_arch = "wasm32")]
impl BrowserBoundary {
    pub fn new(sign_in_path: impl Into<String>) -> Self {
        Self {
            sign_in_path: sign_in_path.into(),
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl LoginBoundary for BrowserBoundary {
    fn redirect_to_sign_in(&self) {
        let navigated = web_sys::window()
            .map(|window| window.location().set_href(&self.sign_in_path).is_ok())
            .unwrap_or(false);
        if !navigated {
            tracing::error!("failed to navigate to {}", self.sign_in_path);
        }
    }
}

/// Clears the credential store and redirects to sign-in, at most once per
/// session. Concurrent failure paths (a reactive and a proactive refresh
/// failing together) collapse into a single navigation.
pub struct SessionTerminator {
    store: Arc<SessionStore>,
    boundary: Arc<dyn LoginBoundary>,
    terminated: AtomicBool,
}

impl SessionTerminator {
    pub fn new(store: Arc<SessionStore>, boundary: Arc<dyn LoginBoundary>) -> Self {
        Self {
            store,
            boundary,
            terminated: AtomicBool::new(false),
        }
    }

    pub fn terminate(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            debug!("session already terminated");
            return;
        }

        self.store.clear();
        info!("session terminated, redirecting to sign-in");
        self.boundary.redirect_to_sign_in();
    }

    /// A fresh sign-in makes the terminator usable again.
    pub(crate) fn rearm(&self) {
        self.terminated.store(false, Ordering::SeqCst);
    }
}
