//! Scripted collaborators for exercising the request layer without a
//! network: a transport that plays a tiny dashboard backend, and a
//! recording sign-in boundary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use super::config::ClientConfig;
use super::errors::RequestError;
use super::session::SessionStore;
use super::sign_out::LoginBoundary;
use super::storage::{KeyValueStorage, MemoryStorage};
use super::transport::{HttpRequest, HttpResponse, HttpTransport};
use super::ApiClient;

/// What the scripted refresh endpoint does when called.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum RefreshBehavior {
    /// Mint a rotated access/refresh pair.
    Succeed,
    /// Respond 500 with an error message.
    FailHttp,
    /// Respond 200 but with a `success: false` envelope.
    FailEnvelope,
    /// Fail at the transport level.
    FailNetwork,
}

struct TransportState {
    valid_access: String,
    valid_refresh: String,
    mint_counter: u32,
    refresh_calls: u32,
    /// Bearer tokens presented on successfully authorized resource calls,
    /// in dispatch order.
    authorized_log: Vec<(String, String)>,
}

/// In-memory stand-in for the dashboard API.
pub(crate) struct ScriptedTransport {
    /// Cooperative yields before the refresh endpoint answers, so
    /// concurrent callers get a chance to pile up behind the refresh.
    refresh_yields: usize,
    behavior: Mutex<RefreshBehavior>,
    state: Mutex<TransportState>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self {
            refresh_yields: 6,
            behavior: Mutex::new(RefreshBehavior::Succeed),
            state: Mutex::new(TransportState {
                valid_access: "access-0".to_string(),
                valid_refresh: "refresh-0".to_string(),
                mint_counter: 0,
                refresh_calls: 0,
                authorized_log: Vec::new(),
            }),
        }
    }

    pub(crate) fn set_refresh_behavior(&self, behavior: RefreshBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub(crate) fn refresh_calls(&self) -> u32 {
        self.state.lock().unwrap().refresh_calls
    }

    pub(crate) fn current_access(&self) -> String {
        self.state.lock().unwrap().valid_access.clone()
    }

    /// `(tag, bearer)` pairs for every authorized resource dispatch.
    pub(crate) fn authorized_log(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().authorized_log.clone()
    }

    fn last_header(request: &HttpRequest, name: &str) -> Option<String> {
        request
            .headers
            .iter()
            .rev()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    fn bearer(request: &HttpRequest) -> Option<String> {
        Self::last_header(request, "Authorization")
            .and_then(|value| value.strip_prefix("Bearer ").map(|t| t.to_string()))
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        if request.url.ends_with("/auth/refresh") {
            {
                self.state.lock().unwrap().refresh_calls += 1;
            }
            for _ in 0..self.refresh_yields {
                tokio::task::yield_now().await;
            }

            let behavior = *self.behavior.lock().unwrap();
            return match behavior {
                RefreshBehavior::FailNetwork => Err(RequestError::NetworkError {
                    message: "connection reset".to_string(),
                }),
                RefreshBehavior::FailHttp => Ok(HttpResponse {
                    status: 500,
                    body: json!({"message": "refresh rejected"}).to_string(),
                }),
                RefreshBehavior::FailEnvelope => Ok(HttpResponse {
                    status: 200,
                    body: json!({"success": false, "message": "refresh denied"}).to_string(),
                }),
                RefreshBehavior::Succeed => {
                    let mut state = self.state.lock().unwrap();
                    state.mint_counter += 1;
                    state.valid_access = format!("access-{}", state.mint_counter);
                    state.valid_refresh = format!("refresh-{}", state.mint_counter);
                    Ok(HttpResponse {
                        status: 200,
                        body: json!({
                            "success": true,
                            "accessToken": state.valid_access,
                            "refreshToken": state.valid_refresh,
                            "expiresIn": 3600,
                        })
                        .to_string(),
                    })
                }
            };
        }

        if request.url.ends_with("/auth/login") {
            let password = request
                .body
                .as_ref()
                .and_then(|body| body.get("password"))
                .and_then(|p| p.as_str())
                .unwrap_or_default();
            if password != "correct-horse" {
                return Ok(HttpResponse {
                    status: 401,
                    body: json!({"message": "Invalid credentials"}).to_string(),
                });
            }

            let mut state = self.state.lock().unwrap();
            state.valid_access = "access-login".to_string();
            state.valid_refresh = "refresh-login".to_string();
            return Ok(HttpResponse {
                status: 200,
                body: json!({
                    "success": true,
                    "message": "Welcome back",
                    "accessToken": state.valid_access,
                    "refreshToken": state.valid_refresh,
                    "expiresIn": 3600,
                    "user": {
                        "id": "u-1",
                        "name": "Dana Field",
                        "email": "dana@example.com",
                        "organizationId": "org-1",
                        "role": "manager",
                    },
                })
                .to_string(),
            });
        }

        // any other path is a protected dashboard resource
        let tag = Self::last_header(&request, "x-request-tag")
            .unwrap_or_else(|| request.url.clone());
        let bearer = Self::bearer(&request);

        let mut state = self.state.lock().unwrap();
        match bearer {
            Some(token) if token == state.valid_access => {
                state.authorized_log.push((tag, token));
                Ok(HttpResponse {
                    status: 200,
                    body: json!({"ok": true}).to_string(),
                })
            }
            _ => Ok(HttpResponse {
                status: 401,
                body: json!({"message": "Unauthorized"}).to_string(),
            }),
        }
    }
}

/// Sign-in boundary that counts navigations instead of performing them.
#[derive(Default)]
pub(crate) struct RecordingBoundary {
    redirects: AtomicUsize,
}

impl RecordingBoundary {
    pub(crate) fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl LoginBoundary for RecordingBoundary {
    fn redirect_to_sign_in(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct TestHarness {
    pub(crate) client: ApiClient,
    pub(crate) transport: Arc<ScriptedTransport>,
    pub(crate) boundary: Arc<RecordingBoundary>,
    pub(crate) storage: Arc<MemoryStorage>,
}

impl TestHarness {
    pub(crate) fn store(&self) -> &Arc<SessionStore> {
        self.client.store()
    }

    /// Put a credential pair in the store without going through sign-in.
    pub(crate) fn seed_session(&self, access: &str, refresh: &str, ttl_seconds: Option<u64>) {
        self.store()
            .save(
                &super::types::SessionCredentials {
                    access_token: access.to_string(),
                    refresh_token: refresh.to_string(),
                    expires_at_millis: None,
                },
                ttl_seconds,
            )
            .unwrap();
    }
}

pub(crate) fn harness() -> TestHarness {
    let transport = Arc::new(ScriptedTransport::new());
    let boundary = Arc::new(RecordingBoundary::default());
    let storage = Arc::new(MemoryStorage::new());
    let client = ApiClient::with_transport(
        ClientConfig::new("https://api.test"),
        storage.clone() as Arc<dyn KeyValueStorage>,
        boundary.clone() as Arc<dyn LoginBoundary>,
        transport.clone(),
    );
    TestHarness {
        client,
        transport,
        boundary,
        storage,
    }
}
