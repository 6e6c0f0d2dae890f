//! Bearer token acquisition for the Personio API.

use std::sync::atomic::{AtomicU64, Ordering};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};

use crate::{TapError, TapResult};

/// How often a fresh token is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshCadence {
    /// Request a new token before every page request.
    #[default]
    PerPage,
    /// Request a token once and reuse it for the rest of the run.
    Once,
}

/// Opaque bearer credential. Expiry is server-defined and unknown to us.
#[derive(Debug)]
pub struct AuthToken(SecretString);

impl Clone for AuthToken {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl AuthToken {
    /// Wraps a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::new(token.into()))
    }

    /// Returns the raw token for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Response envelope of `POST /auth`.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    success: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Value,
}

impl AuthResponse {
    fn token(&self) -> Option<&str> {
        self.data.get("token").and_then(Value::as_str)
    }

    fn failure_message(&self) -> String {
        self.data
            .get("message")
            .or_else(|| self.error.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("no message in auth response")
            .to_string()
    }
}

/// Obtains bearer tokens from `{base_url}/auth`.
#[derive(Debug)]
pub struct TokenProvider {
    http_client: reqwest::Client,
    auth_url: String,
    client_id: String,
    client_secret: SecretString,
    cadence: RefreshCadence,
    current: RwLock<Option<AuthToken>>,
    requests: AtomicU64,
}

impl TokenProvider {
    /// Creates a provider that posts credentials to `auth_url`.
    pub fn new(
        http_client: reqwest::Client,
        auth_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
        cadence: RefreshCadence,
    ) -> Self {
        Self {
            http_client,
            auth_url: auth_url.into(),
            client_id: client_id.into(),
            client_secret,
            cadence,
            current: RwLock::new(None),
            requests: AtomicU64::new(0),
        }
    }

    /// Configured refresh cadence.
    #[must_use]
    pub fn cadence(&self) -> RefreshCadence {
        self.cadence
    }

    /// Number of token requests issued so far.
    #[must_use]
    pub fn requests_issued(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Requests a new token. Never served from cache and never retried.
    #[instrument(skip(self), fields(client_id = %self.client_id))]
    pub async fn authenticate(&self) -> TapResult<AuthToken> {
        debug!("Getting new authorization token");
        self.requests.fetch_add(1, Ordering::Relaxed);

        let response = self
            .http_client
            .post(&self.auth_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret().as_str()),
            ])
            .send()
            .await
            .map_err(|e| TapError::Auth {
                message: format!("token request failed: {e}"),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| TapError::Auth {
            message: format!("failed to read auth response: {e}"),
        })?;

        let parsed: AuthResponse = serde_json::from_str(&body).map_err(|e| {
            error!(status = %status, body = %body, "Unparseable auth response");
            TapError::Auth {
                message: format!("failed to parse auth response (status {status}): {e}"),
            }
        })?;

        if !parsed.success {
            let message = parsed.failure_message();
            error!(status = %status, "Could not authorize with Personio: {}", message);
            return Err(TapError::Auth { message });
        }

        let token = parsed.token().map(AuthToken::new).ok_or_else(|| TapError::Auth {
            message: "auth response has no data.token".to_string(),
        })?;

        debug!("Successfully authorized to Personio");
        *self.current.write().await = Some(token.clone());
        Ok(token)
    }

    /// Returns the token to attach to the next request, honoring the cadence.
    pub async fn token(&self) -> TapResult<AuthToken> {
        if self.cadence == RefreshCadence::Once {
            if let Some(ref token) = *self.current.read().await {
                debug!("Reusing token");
                return Ok(token.clone());
            }
        }
        self.authenticate().await
    }

    /// Drops the remembered token.
    pub async fn invalidate(&self) {
        *self.current.write().await = None;
    }
}
