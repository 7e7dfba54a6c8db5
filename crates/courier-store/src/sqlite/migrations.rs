//! Schema migrations, tracked via `PRAGMA user_version`.

use rusqlite::Connection;
use tracing::info;

use crate::errors::Result;

/// Ordered migration scripts. Index + 1 is the resulting `user_version`.
const MIGRATIONS: &[&str] = &[
    // v1: per-device message log
    "CREATE TABLE messages (
         id         TEXT PRIMARY KEY,
         device_id  TEXT NOT NULL,
         content    TEXT NOT NULL,
         created_at TEXT NOT NULL
     );
     CREATE INDEX idx_messages_device_id ON messages(device_id);",
];

/// Apply any pending migrations. Idempotent.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    for (index, script) in MIGRATIONS.iter().enumerate() {
        let version = index as i64 + 1;
        if version <= current {
            continue;
        }
        conn.execute_batch(script)?;
        conn.pragma_update(None, "user_version", version)?;
        info!(version, "applied database migration");
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
