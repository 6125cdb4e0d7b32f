//! Authentication session manager.
//!
//! [`AuthManager`] is the single mutator of [`SessionRecord`]s: login
//! stores the token, the expiry handler clears it, logout deletes the
//! record. Raw passwords pass through [`AuthManager::login`] once and are
//! never persisted or logged.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, instrument, warn};

use colloquy_gateway::{ApiTransport, GatewayError};
use colloquy_store::{SessionRecord, SessionStore};

use crate::error::{AuthError, Result};

/// High-level manager for the per-identity authentication lifecycle.
pub struct AuthManager {
    sessions: SessionStore,
    transport: Arc<dyn ApiTransport>,
    /// The external credential-validation endpoint.
    login_url: String,
}

impl AuthManager {
    /// Create a manager validating credentials against `login_url`.
    pub fn new(
        sessions: SessionStore,
        transport: Arc<dyn ApiTransport>,
        login_url: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            transport,
            login_url: login_url.into(),
        }
    }

    /// Validate credentials against the external endpoint and record the
    /// session on success.
    ///
    /// The endpoint is expected to answer 2xx with `{"success": true,
    /// "token": "..."}`. Any 2xx without that shape, and any 4xx, maps to
    /// [`AuthError::InvalidCredentials`]; transport failures propagate so
    /// the caller can distinguish "wrong password" from "backend down".
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        identity: &str,
        username: &str,
        password: &str,
    ) -> Result<SessionRecord> {
        let payload = json!({
            "email": username,
            "password": password,
        });

        let response = match self
            .transport
            .invoke("POST", &self.login_url, &payload, None)
            .await
        {
            Ok(body) => body,
            Err(GatewayError::Http { status, .. }) if (400..500).contains(&status) => {
                warn!(identity, status, "credential endpoint rejected login");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        let success = response
            .get("success")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let token = response.get("token").and_then(|v| v.as_str());

        match (success, token) {
            (true, Some(token)) => {
                let record = self.sessions.upsert_login(identity, username, token).await?;
                info!(identity, "login successful");
                Ok(record)
            }
            _ => {
                warn!(identity, "credential endpoint returned no token");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// The gate checked before any API-calling step: returns the live
    /// bearer token or [`AuthError::NotLoggedIn`].
    pub async fn require_session(&self, identity: &str) -> Result<String> {
        self.sessions
            .token(identity)
            .await?
            .ok_or_else(|| AuthError::NotLoggedIn {
                identity: identity.to_string(),
            })
    }

    /// Whether the identity currently holds a live token.
    pub async fn is_logged_in(&self, identity: &str) -> Result<bool> {
        Ok(self.sessions.token(identity).await?.is_some())
    }

    /// Explicit logout: delete the record. Returns `true` if one existed.
    #[instrument(skip(self))]
    pub async fn logout(&self, identity: &str) -> Result<bool> {
        let existed = self.sessions.delete(identity).await?;
        if existed {
            info!(identity, "logged out");
        }
        Ok(existed)
    }

    /// CSRF-expiry handler: clear the token but keep the record, so the
    /// username reference survives for the next login prompt.
    #[instrument(skip(self))]
    pub async fn expire(&self, identity: &str) -> Result<()> {
        self.sessions.clear_token(identity).await?;
        info!(identity, "session expired, token cleared");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
