use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
use js_sys;

/// Get current time in milliseconds since UNIX epoch (WASM compatible)
#[cfg(target_arch = "wasm32")]
pub(crate) fn current_time_millis() -> u64 {
    js_sys::Date::now() as u64
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn current_time_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub(crate) fn current_time_secs() -> u64 {
    current_time_millis() / 1000
}

/// The access/refresh credential pair for the signed-in user.
///
/// Written only by a successful sign-in or refresh, destroyed by sign-out or
/// an irrecoverable refresh failure. When written, both tokens are non-empty
/// and `expires_at_millis` (if known) lies in the future.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionCredentials {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    #[serde(rename = "expiresAt")]
    pub expires_at_millis: Option<u64>,
}

impl SessionCredentials {
    pub fn is_expired(&self) -> bool {
        if let Some(expires_at) = self.expires_at_millis {
            current_time_millis() >= expires_at
        } else {
            false
        }
    }

    /// Whether the access token is inside the early-refresh window.
    pub fn needs_refresh(&self, buffer_secs: u64) -> bool {
        if let Some(expires_at) = self.expires_at_millis {
            current_time_millis() >= expires_at.saturating_sub(buffer_secs * 1000)
        } else {
            false
        }
    }
}

/// Sign-in request body
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

/// Sign-in outcome handed back to the UI layer
#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub user: Option<UserProfile>,
}

/// Profile of the signed-in user, derived from the sign-in response and kept
/// in the ephemeral cache next to the credential slots.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    #[serde(rename = "organizationId")]
    pub organization_id: Option<String>,
    pub role: Option<String>,
}
