//! Client configuration.
//!
//! One struct covers everything the request layer needs to know about its
//! environment: where the API lives, which endpoints mint and refresh
//! credentials, where the sign-in page is, and how eagerly to refresh.

use serde::{Deserialize, Serialize};

/// Configuration for the authenticated request layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the dashboard API, without a trailing slash
    pub base_url: String,

    /// Sign-in endpoint path
    pub login_path: String,

    /// Credential refresh endpoint path
    pub refresh_path: String,

    /// Path of the sign-in page users are sent to on session teardown
    pub sign_in_path: String,

    /// How many seconds before expiry the proactive scheduler refreshes
    pub refresh_buffer_secs: u64,

    /// Interval between proactive scheduler checks, in seconds
    pub scheduler_interval_secs: u64,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            login_path: "/auth/login".to_string(),
            refresh_path: "/auth/refresh".to_string(),
            sign_in_path: "/login".to_string(),
            refresh_buffer_secs: 300,
            scheduler_interval_secs: 60,
        }
    }
}
