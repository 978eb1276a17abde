use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use super::errors::RequestError;
use super::storage::KeyValueStorage;
use super::types::{current_time_millis, current_time_secs, SessionCredentials, UserProfile};

/// Session store for credential persistence and expiry tracking.
///
/// The token pair lives in one durable slot, the absolute expiration instant
/// in a second one so expiry can be checked without decoding the access
/// token. The derived user profile sits in an ephemeral in-memory cache and
/// is wiped together with the durable slots.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
    tokens_key: String,
    expiry_key: String,
    profile: Mutex<Option<UserProfile>>,
}

/// Durable shape of the token-pair slot. Expiry is deliberately not part of
/// it; the separate slot is the source of truth for expiration.
#[derive(serde::Serialize, serde::Deserialize)]
struct StoredTokens {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>, storage_key: &str) -> Self {
        Self {
            storage,
            tokens_key: storage_key.to_string(),
            expiry_key: format!("{}_expires_at", storage_key),
            profile: Mutex::new(None),
        }
    }

    /// Persist a credential pair with the given lifetime.
    ///
    /// The expiration slot is written as an absolute instant computed from
    /// `ttl_seconds`; with no known lifetime the slot is removed so a later
    /// load reports the expiry as unknown rather than stale.
    pub fn save(
        &self,
        credentials: &SessionCredentials,
        ttl_seconds: Option<u64>,
    ) -> Result<(), RequestError> {
        let tokens = StoredTokens {
            access_token: credentials.access_token.clone(),
            refresh_token: credentials.refresh_token.clone(),
        };
        let tokens_json =
            serde_json::to_string(&tokens).map_err(|e| RequestError::SerializationError {
                message: format!("failed to serialize credentials: {}", e),
            })?;

        self.storage.set(&self.tokens_key, &tokens_json)?;

        match ttl_seconds {
            Some(ttl) => {
                let expires_at = current_time_millis() + ttl * 1000;
                self.storage.set(&self.expiry_key, &expires_at.to_string())?;
            }
            None => self.storage.remove(&self.expiry_key),
        }

        info!("session credentials stored");
        Ok(())
    }

    /// Read whatever credentials are present.
    ///
    /// Partial state is tolerated: a token pair without an expiry slot loads
    /// with `expires_at_millis: None`. Unreadable slots count as absent.
    pub fn load(&self) -> Option<SessionCredentials> {
        let tokens_json = self.storage.get(&self.tokens_key)?;

        let tokens: StoredTokens = match serde_json::from_str(&tokens_json) {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("discarding unreadable credential slot: {}", e);
                return None;
            }
        };

        Some(SessionCredentials {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at_millis: self.stored_expiry(),
        })
    }

    /// The absolute expiration instant recorded at the last save, if any.
    pub fn stored_expiry(&self) -> Option<u64> {
        self.storage
            .get(&self.expiry_key)
            .and_then(|raw| raw.parse::<u64>().ok())
    }

    /// Remove both durable slots and the cached profile.
    pub fn clear(&self) {
        self.storage.remove(&self.tokens_key);
        self.storage.remove(&self.expiry_key);
        if let Ok(mut profile) = self.profile.lock() {
            *profile = None;
        }
        info!("session credentials cleared");
    }

    pub fn cache_profile(&self, profile: UserProfile) {
        if let Ok(mut cached) = self.profile.lock() {
            *cached = Some(profile);
        }
    }

    pub fn cached_profile(&self) -> Option<UserProfile> {
        self.profile.lock().ok().and_then(|cached| cached.clone())
    }
}

/// Parse the `exp` claim out of a JWT without verifying it.
///
/// Fallback for responses that carry no explicit lifetime. Returns seconds
/// since the UNIX epoch.
pub(crate) fn token_expiration_secs(jwt: &str) -> Option<u64> {
    let parts: Vec<&str> = jwt.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let payload_b64 = parts[1];
    let padded = match payload_b64.len() % 4 {
        2 => format!("{}==", payload_b64),
        3 => format!("{}=", payload_b64),
        _ => payload_b64.to_string(),
    };

    use base64::Engine;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(&padded)
        .ok()?;
    let payload: serde_json::Value = serde_json::from_slice(&decoded).ok()?;
    payload.get("exp")?.as_u64()
}

/// Remaining lifetime of a JWT in seconds, if its `exp` claim is readable
/// and still ahead of the clock.
pub(crate) fn token_remaining_secs(jwt: &str) -> Option<u64> {
    let exp = token_expiration_secs(jwt)?;
    let now = current_time_secs();
    if exp > now {
        Some(exp - now)
    } else {
        None
    }
}
