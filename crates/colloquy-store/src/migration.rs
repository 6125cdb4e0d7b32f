//! Schema migration system.
//!
//! Migrations are static SQL strings keyed by version number. Applied
//! versions are tracked in a `_migrations` table so re-running is a no-op.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

/// A single migration definition.
struct Migration {
    /// Monotonically increasing version number (1, 2, 3, ...).
    version: u32,
    /// Human-readable description.
    description: &'static str,
    /// Raw SQL. May contain multiple statements separated by `;`.
    sql: &'static str,
}

/// All migrations in order. Add new migrations to the end of this array.
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "initial schema — auth sessions and conversation state",
    sql: r#"
        CREATE TABLE auth_sessions (
            identity       TEXT PRIMARY KEY,
            credential_ref TEXT NOT NULL,
            token          TEXT,
            last_login     INTEGER NOT NULL
        );

        CREATE TABLE conversations (
            identity         TEXT PRIMARY KEY,
            intent           TEXT NOT NULL,
            current_step     TEXT NOT NULL,
            collected        TEXT NOT NULL,
            invalid_attempts INTEGER NOT NULL DEFAULT 0,
            updated_at       INTEGER NOT NULL
        );
    "#,
}];

/// Run every migration that has not been applied yet.
pub fn run_all(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version     INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at  INTEGER NOT NULL
        );",
    )?;

    let current: u32 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| {
            row.get(0)
        })?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        debug!(
            version = migration.version,
            description = migration.description,
            "applying migration"
        );

        conn.execute_batch(migration.sql)
            .map_err(|e| StoreError::Migration {
                version: migration.version,
                message: e.to_string(),
            })?;

        conn.execute(
            "INSERT INTO _migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                migration.version,
                migration.description,
                chrono::Utc::now().timestamp()
            ],
        )?;

        info!(version = migration.version, "migration applied");
    }

    Ok(())
}

// ── tests ────────────────────────────────────────────────────────────
