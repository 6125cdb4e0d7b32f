//! Per-identity authentication records.
//!
//! One [`SessionRecord`] per identity, independent of any active
//! conversation. The record stores a non-secret credential reference (the
//! account username) and the bearer token; raw passwords are never
//! persisted. A CSRF expiry clears only the token — the row survives so
//! the login prompt can greet the returning user — while an explicit
//! logout deletes the row.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::StoreResult;

/// Authentication state for one identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// The chat identity this record belongs to.
    pub identity: String,
    /// Non-secret reference to the credentials used at login (username).
    pub credential_ref: String,
    /// Bearer token, `None` once the session has been logged out or
    /// expired.
    pub token: Option<String>,
    /// Unix timestamp of the last successful login.
    pub last_login: i64,
}

impl SessionRecord {
    /// Whether this record holds a live token.
    pub fn is_active(&self) -> bool {
        self.token.is_some()
    }
}

/// CRUD operations on per-identity authentication records.
#[derive(Clone)]
pub struct SessionStore {
    db: Database,
}

impl SessionStore {
    /// Create a session store backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a successful login: insert or replace the identity's record
    /// with a fresh token and timestamp.
    #[instrument(skip(self, token))]
    pub async fn upsert_login(
        &self,
        identity: &str,
        credential_ref: &str,
        token: &str,
    ) -> StoreResult<SessionRecord> {
        let record = SessionRecord {
            identity: identity.to_string(),
            credential_ref: credential_ref.to_string(),
            token: Some(token.to_string()),
            last_login: Utc::now().timestamp(),
        };

        let row = record.clone();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO auth_sessions (identity, credential_ref, token, last_login) \
                     VALUES (?1, ?2, ?3, ?4) \
                     ON CONFLICT(identity) DO UPDATE SET \
                         credential_ref = excluded.credential_ref, \
                         token = excluded.token, \
                         last_login = excluded.last_login",
                    rusqlite::params![row.identity, row.credential_ref, row.token, row.last_login],
                )?;
                Ok(())
            })
            .await?;

        debug!(identity = %record.identity, "login recorded");
        Ok(record)
    }

    /// Fetch the record for an identity, `None` if it has never logged in
    /// (or has explicitly logged out).
    #[instrument(skip(self))]
    pub async fn get(&self, identity: &str) -> StoreResult<Option<SessionRecord>> {
        let identity = identity.to_string();
        self.db
            .execute(move |conn| {
                let result = conn.query_row(
                    "SELECT identity, credential_ref, token, last_login \
                     FROM auth_sessions WHERE identity = ?1",
                    rusqlite::params![identity],
                    |row| {
                        Ok(SessionRecord {
                            identity: row.get(0)?,
                            credential_ref: row.get(1)?,
                            token: row.get(2)?,
                            last_login: row.get(3)?,
                        })
                    },
                );
                match result {
                    Ok(record) => Ok(Some(record)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
    }

    /// The identity's live token, if any.
    pub async fn token(&self, identity: &str) -> StoreResult<Option<String>> {
        Ok(self.get(identity).await?.and_then(|r| r.token))
    }

    /// Clear the token (CSRF expiry), keeping the record. Returns `true`
    /// if a record existed.
    #[instrument(skip(self))]
    pub async fn clear_token(&self, identity: &str) -> StoreResult<bool> {
        let identity = identity.to_string();
        self.db
            .execute(move |conn| {
                let updated = conn.execute(
                    "UPDATE auth_sessions SET token = NULL WHERE identity = ?1",
                    rusqlite::params![identity],
                )?;
                if updated > 0 {
                    debug!(identity = %identity, "session token cleared");
                }
                Ok(updated > 0)
            })
            .await
    }

    /// Delete the record entirely (explicit logout). Returns `true` if a
    /// record existed.
    #[instrument(skip(self))]
    pub async fn delete(&self, identity: &str) -> StoreResult<bool> {
        let identity = identity.to_string();
        self.db
            .execute(move |conn| {
                let deleted = conn.execute(
                    "DELETE FROM auth_sessions WHERE identity = ?1",
                    rusqlite::params![identity],
                )?;
                Ok(deleted > 0)
            })
            .await
    }
}

// ── tests ────────────────────────────────────────────────────────────
