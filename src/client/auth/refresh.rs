use anyhow::Result;
use tracing::{error, info, instrument};

use crate::client::config::ClientConfig;
use crate::client::errors::RequestError;
use crate::client::executor::error_message;
use crate::client::session::token_remaining_secs;
use crate::client::transport::{HttpRequest, SharedTransport};
use crate::client::types::SessionCredentials;

/// Exchange the refresh credential for a new pair.
///
/// Returns the replacement credentials plus their lifetime in seconds when
/// the server stated one (falling back to the access token's own `exp`
/// claim). The refresh credential is kept unless the server rotated it.
/// Every failure shape, including a 2xx body that says `success: false`,
/// is an error here; the caller decides what a failed refresh means for the
/// session.
#[instrument(skip(transport, current), err)]
pub async fn refresh_session_impl(
    transport: &SharedTransport,
    config: &ClientConfig,
    current: &SessionCredentials,
) -> Result<(SessionCredentials, Option<u64>), RequestError> {
    let refresh_url = format!("{}{}", config.base_url, config.refresh_path);

    let response = transport
        .send(HttpRequest {
            method: reqwest::Method::POST,
            url: refresh_url,
            headers: vec![(
                "Authorization".to_string(),
                format!("Bearer {}", current.refresh_token),
            )],
            body: None,
        })
        .await?;

    let parsed: Option<serde_json::Value> = serde_json::from_str(&response.body).ok();

    if !response.is_success() {
        let message = error_message(parsed.as_ref());
        error!("credential refresh failed: {}", message);
        return Err(RequestError::RequestFailed { message });
    }

    let data = parsed.ok_or_else(|| RequestError::SerializationError {
        message: "refresh response is not valid JSON".to_string(),
    })?;

    if !data.get("success").and_then(|v| v.as_bool()).unwrap_or(true) {
        let message = error_message(Some(&data));
        error!("credential refresh rejected: {}", message);
        return Err(RequestError::RequestFailed { message });
    }

    let access_token = data["accessToken"].as_str().unwrap_or_default().to_string();
    if access_token.is_empty() {
        return Err(RequestError::RequestFailed {
            message: "refresh response is missing an access token".to_string(),
        });
    }

    let refreshed = SessionCredentials {
        refresh_token: data["refreshToken"]
            .as_str()
            .unwrap_or(&current.refresh_token)
            .to_string(),
        expires_at_millis: None,
        access_token,
    };

    let ttl_seconds = data["expiresIn"]
        .as_u64()
        .or_else(|| token_remaining_secs(&refreshed.access_token));

    info!("session credentials refreshed");
    Ok((refreshed, ttl_seconds))
}
