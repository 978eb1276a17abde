use anyhow::Result;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::client::config::ClientConfig;
use crate::client::errors::RequestError;
use crate::client::executor::error_message;
use crate::client::session::{token_remaining_secs, SessionStore};
use crate::client::transport::{HttpRequest, SharedTransport};
use crate::client::types::{LoginResponse, SessionCredentials, UserProfile};

/// Sign in against the dashboard API and persist the minted credential pair.
///
/// A rejected sign-in (wrong password, disabled account) comes back as a
/// `success: false` response rather than an error; only transport failures
/// and unusable response bodies are errors.
#[instrument(skip(transport, store, password), err)]
pub async fn login_impl(
    transport: &SharedTransport,
    config: &ClientConfig,
    store: &SessionStore,
    identifier: &str,
    password: &str,
) -> Result<LoginResponse, RequestError> {
    let login_url = format!("{}{}", config.base_url, config.login_path);

    let response = transport
        .send(HttpRequest {
            method: reqwest::Method::POST,
            url: login_url,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(json!({
                "identifier": identifier,
                "password": password,
            })),
        })
        .await?;

    if !response.is_success() {
        let parsed: Option<serde_json::Value> = serde_json::from_str(&response.body).ok();
        let message = error_message(parsed.as_ref());
        warn!("sign-in rejected: {}", message);
        return Ok(LoginResponse {
            success: false,
            message,
            user: None,
        });
    }

    let data: serde_json::Value =
        serde_json::from_str(&response.body).map_err(|e| RequestError::SerializationError {
            message: format!("failed to parse sign-in response: {}", e),
        })?;

    if !data.get("success").and_then(|v| v.as_bool()).unwrap_or(true) {
        let message = error_message(Some(&data));
        warn!("sign-in rejected: {}", message);
        return Ok(LoginResponse {
            success: false,
            message,
            user: None,
        });
    }

    let access_token = data["accessToken"].as_str().unwrap_or_default().to_string();
    let refresh_token = data["refreshToken"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    if access_token.is_empty() || refresh_token.is_empty() {
        return Err(RequestError::RequestFailed {
            message: "sign-in response is missing credentials".to_string(),
        });
    }

    let ttl_seconds = data["expiresIn"]
        .as_u64()
        .or_else(|| token_remaining_secs(&access_token));

    let credentials = SessionCredentials {
        access_token,
        refresh_token,
        expires_at_millis: None,
    };
    store.save(&credentials, ttl_seconds)?;

    let user = data
        .get("user")
        .cloned()
        .and_then(|value| serde_json::from_value::<UserProfile>(value).ok());
    if let Some(profile) = &user {
        store.cache_profile(profile.clone());
    }

    info!("signed in");
    Ok(LoginResponse {
        success: true,
        message: data["message"].as_str().unwrap_or("Signed in").to_string(),
        user,
    })
}
