//! Per-identity active conversation state.
//!
//! At most one [`ConversationState`] exists per identity — the table keys
//! on identity, so a second intent can never create a second entry. The
//! interpreter owns all mutation; the store just persists the snapshot
//! between turns.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::StoreResult;

/// The saved position of one identity inside one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// The command (intent) being walked, by catalog name.
    pub intent: String,
    /// The step currently awaiting a response. Invariant: always names a
    /// step that exists in the intent's step sequence.
    pub current_step: String,
    /// Stored responses, keyed by the step id that collected them.
    pub collected: HashMap<String, String>,
    /// Consecutive invalid inputs at the current step (retry bound).
    pub invalid_attempts: u32,
}

impl ConversationState {
    /// Fresh state positioned at a conversation's entry step.
    pub fn new(intent: impl Into<String>, first_step: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            current_step: first_step.into(),
            collected: HashMap::new(),
            invalid_attempts: 0,
        }
    }
}

/// CRUD operations on per-identity conversation state.
#[derive(Clone)]
pub struct ConversationStore {
    db: Database,
}

impl ConversationStore {
    /// Create a conversation store backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert or replace the identity's conversation state.
    #[instrument(skip(self, state), fields(intent = %state.intent, step = %state.current_step))]
    pub async fn put(&self, identity: &str, state: &ConversationState) -> StoreResult<()> {
        let identity = identity.to_string();
        let intent = state.intent.clone();
        let current_step = state.current_step.clone();
        let collected = serde_json::to_string(&state.collected)?;
        let invalid_attempts = state.invalid_attempts;
        let now = Utc::now().timestamp();

        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO conversations \
                         (identity, intent, current_step, collected, invalid_attempts, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                     ON CONFLICT(identity) DO UPDATE SET \
                         intent = excluded.intent, \
                         current_step = excluded.current_step, \
                         collected = excluded.collected, \
                         invalid_attempts = excluded.invalid_attempts, \
                         updated_at = excluded.updated_at",
                    rusqlite::params![
                        identity,
                        intent,
                        current_step,
                        collected,
                        invalid_attempts,
                        now
                    ],
                )?;
                debug!(identity = %identity, "conversation state saved");
                Ok(())
            })
            .await
    }

    /// Fetch the identity's active conversation, if any.
    #[instrument(skip(self))]
    pub async fn get(&self, identity: &str) -> StoreResult<Option<ConversationState>> {
        let identity = identity.to_string();
        let row: Option<(String, String, String, u32)> = self
            .db
            .execute(move |conn| {
                let result = conn.query_row(
                    "SELECT intent, current_step, collected, invalid_attempts \
                     FROM conversations WHERE identity = ?1",
                    rusqlite::params![identity],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                );
                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        match row {
            Some((intent, current_step, collected, invalid_attempts)) => {
                Ok(Some(ConversationState {
                    intent,
                    current_step,
                    collected: serde_json::from_str(&collected)?,
                    invalid_attempts,
                }))
            }
            None => Ok(None),
        }
    }

    /// Remove the identity's conversation. Returns `true` if one existed.
    /// Safe to call when none does — reset is idempotent.
    #[instrument(skip(self))]
    pub async fn remove(&self, identity: &str) -> StoreResult<bool> {
        let identity = identity.to_string();
        self.db
            .execute(move |conn| {
                let deleted = conn.execute(
                    "DELETE FROM conversations WHERE identity = ?1",
                    rusqlite::params![identity],
                )?;
                if deleted > 0 {
                    debug!(identity = %identity, "conversation state removed");
                }
                Ok(deleted > 0)
            })
            .await
    }
}

// ── tests ────────────────────────────────────────────────────────────
