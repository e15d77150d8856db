//! Schema definitions and migration utilities for the relational engine.
//!
//! Migrations are embedded SQL applied in order inside one transaction. The
//! applied version is mirrored to `PRAGMA user_version`.

use rusqlite::Connection;

use crate::error::{StoreError, StoreResult};

/// One schema step.
#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: r#"
            CREATE TABLE IF NOT EXISTS notes (
                uid        TEXT PRIMARY KEY NOT NULL,
                content    TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                revision   INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS notes_recency ON notes (revision DESC, uid ASC);
        "#,
    },
    Migration {
        version: 2,
        sql: r#"
            CREATE TABLE IF NOT EXISTS tombstones (
                uid        TEXT PRIMARY KEY NOT NULL,
                deleted_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS meta (
                key   TEXT PRIMARY KEY NOT NULL,
                value INTEGER NOT NULL
            );
            INSERT OR IGNORE INTO meta (key, value)
                SELECT 'revision', COALESCE(MAX(revision), 0) FROM notes;
        "#,
    },
];

/// Latest schema version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Apply all pending migrations.
///
/// Idempotent: a database already at the latest version is left untouched.
/// A database written by a newer binary is rejected.
pub fn run_migrations(conn: &mut Connection) -> StoreResult<()> {
    let current = get_schema_version(conn)?;
    let latest = latest_version();

    if current > latest {
        return Err(StoreError::MigrationError(format!(
            "database schema version {current} is newer than supported {latest}"
        )));
    }
    if current == latest {
        return Ok(());
    }

    tracing::info!(from = current, to = latest, "Running SQLite migrations");

    let tx = conn
        .transaction()
        .map_err(|e| StoreError::MigrationError(e.to_string()))?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        tracing::debug!(version = migration.version, "Applying migration");
        tx.execute_batch(migration.sql)
            .and_then(|()| {
                tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
            })
            .map_err(|e| {
                StoreError::MigrationError(format!("migration {} failed: {e}", migration.version))
            })?;
    }
    tx.commit()
        .map_err(|e| StoreError::MigrationError(e.to_string()))?;

    Ok(())
}

/// Current schema version from `PRAGMA user_version`.
pub fn get_schema_version(conn: &Connection) -> StoreResult<u32> {
    conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))
        .map_err(|e| StoreError::MigrationError(e.to_string()))
}
