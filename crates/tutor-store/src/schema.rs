use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, StoreError};

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.pragma_update(None, "wal_autocheckpoint", 100)?;

    // Errors are non-fatal: in-memory DBs and fresh files legitimately fail this.
    if conn
        .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        .is_ok()
    {
        tracing::info!("startup WAL checkpoint complete");
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS skills (
            id                TEXT PRIMARY KEY,
            name              TEXT NOT NULL DEFAULT '',
            is_parent         INTEGER NOT NULL,
            parent_id         TEXT,
            mastery           REAL NOT NULL,
            total_attempts    INTEGER NOT NULL DEFAULT 0,
            correct_streak    INTEGER NOT NULL DEFAULT 0,
            avg_response_time REAL NOT NULL DEFAULT 0,
            sub_skill_ids     TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS cards (
            seq              INTEGER PRIMARY KEY AUTOINCREMENT,
            id               TEXT NOT NULL UNIQUE,
            deck             TEXT NOT NULL DEFAULT '',
            front            TEXT NOT NULL,
            back             TEXT NOT NULL,
            interval_days    INTEGER NOT NULL DEFAULT 0,
            repetition       INTEGER NOT NULL DEFAULT 0,
            ease_factor      REAL NOT NULL DEFAULT 2.5,
            next_review_date INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS interactions (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            topic_id     TEXT NOT NULL,
            sub_skill_id TEXT NOT NULL,
            is_correct   INTEGER NOT NULL,
            time_spent   REAL NOT NULL,
            difficulty   TEXT NOT NULL,
            recorded_at  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS review_log (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            card_id     TEXT NOT NULL,
            grade       INTEGER NOT NULL,
            reviewed_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_skill_parent ON skills(parent_id);
        CREATE INDEX IF NOT EXISTS idx_card_due ON cards(next_review_date);
        CREATE INDEX IF NOT EXISTS idx_interaction_skill ON interactions(sub_skill_id);
        CREATE INDEX IF NOT EXISTS idx_review_card ON review_log(card_id);
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// `None` when the database has never been initialized.
pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    value
        .map(|v| {
            v.parse::<i64>()
                .map_err(|_| StoreError::InvalidData(format!("corrupt schema_version '{v}'")))
        })
        .transpose()
}
