// Authenticated request layer for the WorkHub dashboard.
//
// This module provides the complete client-side credential lifecycle:
// - Sign-in and durable credential storage
// - Bearer-token attachment on every outbound call
// - Transparent single-flight refresh with request replay on 401
// - Proactive refresh ahead of expiry
// - Clean session teardown when refresh is impossible
//
// Dashboard features (attendance, leave, tasks, organizations) only ever
// see `ApiClient::execute` and its verb helpers.

pub mod auth;
pub mod config;
pub mod errors;
pub mod executor;
pub mod scheduler;
pub mod session;
pub mod session_refresh;
pub mod sign_out;
pub mod storage;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;


use std::sync::Arc;

use tracing::{instrument, warn};

// Re-export core types for easy access
pub use config::ClientConfig;
pub use errors::{RequestError, RequestResult};
pub use executor::{ApiRequest, RequestExecutor};
pub use scheduler::SchedulerHandle;
pub use session::SessionStore;
pub use session_refresh::{FailureCallback, RefreshCoordinator};
pub use sign_out::{LoginBoundary, SessionTerminator};
pub use storage::{KeyValueStorage, MemoryStorage};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, SharedTransport};
pub use types::{LoginRequest, LoginResponse, SessionCredentials, UserProfile};

#[cfg(target_arch = "wasm32")]
pub use sign_out::BrowserBoundary;
#[cfg(target_arch = "wasm32")]
pub use storage::BrowserStorage;

/// Storage key prefix for the credential slots.
const SESSION_STORAGE_KEY: &str = "workhub_session";

/// How many refresh cycles a single request may ride before its 401 is
/// surfaced instead of retried.
const MAX_REFRESH_CYCLES: u32 = 2;

/// The one call surface the rest of the application needs.
///
/// Owns the credential store, the refresh coordinator, and the session
/// terminator. One instance per application session, passed by reference to
/// whatever needs the request layer.
#[derive(Clone)]
pub struct ApiClient {
    config: Arc<ClientConfig>,
    store: Arc<SessionStore>,
    transport: SharedTransport,
    executor: RequestExecutor,
    refresh: Arc<RefreshCoordinator>,
    terminator: Arc<SessionTerminator>,
}

impl ApiClient {
    /// Build a client over the default HTTP transport.
    pub fn new(
        config: ClientConfig,
        storage: Arc<dyn KeyValueStorage>,
        boundary: Arc<dyn LoginBoundary>,
    ) -> Self {
        Self::with_transport(config, storage, boundary, Arc::new(ReqwestTransport::new()))
    }

    /// Build a client over a custom transport (used by tests and native
    /// shells that bring their own HTTP stack).
    pub fn with_transport(
        config: ClientConfig,
        storage: Arc<dyn KeyValueStorage>,
        boundary: Arc<dyn LoginBoundary>,
        transport: SharedTransport,
    ) -> Self {
        let config = Arc::new(config);
        let store = Arc::new(SessionStore::new(storage, SESSION_STORAGE_KEY));
        let terminator = Arc::new(SessionTerminator::new(store.clone(), boundary));
        let executor = RequestExecutor::new(
            transport.clone(),
            store.clone(),
            config.base_url.clone(),
        );
        let refresh = Arc::new(RefreshCoordinator::new(
            store.clone(),
            transport.clone(),
            config.clone(),
            terminator.clone(),
        ));

        Self {
            config,
            store,
            transport,
            executor,
            refresh,
            terminator,
        }
    }

    /// Browser construction: localStorage persistence and full-page
    /// navigation to the sign-in route.
    #[cfg(target_arch = "wasm32")]
    pub fn new_browser(config: ClientConfig) -> Self {
        let boundary = Arc::new(BrowserBoundary::new(config.sign_in_path.clone()));
        Self::new(config, Arc::new(BrowserStorage::new()), boundary)
    }

    /// Sign in and persist the minted credentials.
    #[instrument(skip(self, password), err)]
    pub async fn login(&self, identifier: &str, password: &str) -> RequestResult<LoginResponse> {
        let response =
            auth::login_impl(&self.transport, &self.config, &self.store, identifier, password)
                .await?;
        if response.success {
            self.terminator.rearm();
        }
        Ok(response)
    }

    /// Issue an authenticated request.
    ///
    /// A 401 is recovered internally: the request parks on the (single)
    /// refresh and is replayed with the replacement token. Callers only see
    /// the final outcome.
    pub async fn execute(&self, request: ApiRequest) -> RequestResult<serde_json::Value> {
        let mut refresh_cycles = 0;
        let mut outcome = self.executor.execute(&request).await;

        while matches!(outcome, Err(RequestError::AuthenticationExpired)) {
            if refresh_cycles >= MAX_REFRESH_CYCLES {
                warn!(
                    path = %request.path,
                    "request still unauthorized after {} refresh cycles",
                    refresh_cycles
                );
                return Err(RequestError::RequestFailed {
                    message: "request remained unauthorized after credential refresh".to_string(),
                });
            }
            refresh_cycles += 1;

            let access_token = self.refresh.fresh_access_token().await?;
            outcome = self
                .executor
                .execute_with_token(&request, &access_token)
                .await;
        }

        outcome
    }

    pub async fn get(&self, path: &str) -> RequestResult<serde_json::Value> {
        self.execute(ApiRequest::get(path)).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> RequestResult<serde_json::Value> {
        self.execute(ApiRequest::post(path, body)).await
    }

    pub async fn put(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> RequestResult<serde_json::Value> {
        self.execute(ApiRequest::put(path, body)).await
    }

    pub async fn delete(&self, path: &str) -> RequestResult<serde_json::Value> {
        self.execute(ApiRequest::delete(path)).await
    }

    /// Start the proactive refresh loop for this session. The optional
    /// callback fires if a refresh fails, before navigation to sign-in.
    pub fn start_proactive_refresh(&self, on_failure: Option<FailureCallback>) -> SchedulerHandle {
        scheduler::start(
            self.refresh.clone(),
            self.store.clone(),
            self.config.clone(),
            on_failure,
        )
    }

    /// Explicit sign-out: same teardown as an irrecoverable refresh failure.
    pub fn sign_out(&self) {
        self.terminator.terminate();
    }

    /// Profile of the signed-in user, if one is cached.
    pub fn current_user(&self) -> Option<UserProfile> {
        self.store.cached_profile()
    }

    /// Currently stored credentials, if any.
    pub fn session(&self) -> Option<SessionCredentials> {
        self.store.load()
    }
}

#[cfg(test)]
impl ApiClient {
    pub(crate) fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub(crate) fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.refresh
    }

    pub(crate) fn client_config(&self) -> &Arc<ClientConfig> {
        &self.config
    }
}
