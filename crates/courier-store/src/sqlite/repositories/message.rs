//! Message repository — inserts and per-device reads on the `messages` table.

use courier_core::events::ChatRecord;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::errors::Result;

/// Message repository — stateless, every method takes `&Connection`.
pub struct MessageRepo;

impl MessageRepo {
    /// Append one message for a device. ID and timestamp are assigned here.
    pub fn insert(conn: &Connection, device_id: &str, content: &str) -> Result<ChatRecord> {
        let id = format!("msg_{}", Uuid::now_v7());
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO messages (id, device_id, content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, device_id, content, now],
        )?;
        Ok(ChatRecord {
            id,
            device_id: device_id.to_string(),
            content: content.to_string(),
            created_at: now,
        })
    }

    /// All messages for a device in insertion order. Empty for an unknown
    /// device — "never seen" and "seen, zero messages" read the same.
    pub fn list_by_device(conn: &Connection, device_id: &str) -> Result<Vec<ChatRecord>> {
        let mut stmt = conn.prepare(
            "SELECT id, device_id, content, created_at
             FROM messages WHERE device_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![device_id], |row| {
                Ok(ChatRecord {
                    id: row.get(0)?,
                    device_id: row.get(1)?,
                    content: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Count messages for a device.
    pub fn count_by_device(conn: &Connection, device_id: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE device_id = ?1",
            params![device_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::sqlite::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
            .unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn insert_assigns_id_and_timestamp() {
        let conn = setup();
        let record = MessageRepo::insert(&conn, "dev_a", "hello").unwrap();

        assert!(record.id.starts_with("msg_"));
        assert_eq!(record.device_id, "dev_a");
        assert_eq!(record.content, "hello");
        assert!(!record.created_at.is_empty());
    }

    #[test]
    fn list_preserves_insertion_order() {
        let conn = setup();
        MessageRepo::insert(&conn, "dev_a", "first").unwrap();
        MessageRepo::insert(&conn, "dev_a", "second").unwrap();
        MessageRepo::insert(&conn, "dev_a", "third").unwrap();

        let records = MessageRepo::list_by_device(&conn, "dev_a").unwrap();
        let contents: Vec<&str> = records.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);
    }

    #[test]
    fn list_scopes_by_device() {
        let conn = setup();
        MessageRepo::insert(&conn, "dev_a", "mine").unwrap();
        MessageRepo::insert(&conn, "dev_b", "theirs").unwrap();

        let records = MessageRepo::list_by_device(&conn, "dev_a").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "mine");
    }

    #[test]
    fn list_unknown_device_is_empty_not_error() {
        let conn = setup();
        let records = MessageRepo::list_by_device(&conn, "dev_never_seen").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn count_by_device() {
        let conn = setup();
        assert_eq!(MessageRepo::count_by_device(&conn, "dev_a").unwrap(), 0);

        MessageRepo::insert(&conn, "dev_a", "one").unwrap();
        MessageRepo::insert(&conn, "dev_a", "two").unwrap();
        MessageRepo::insert(&conn, "dev_b", "other").unwrap();

        assert_eq!(MessageRepo::count_by_device(&conn, "dev_a").unwrap(), 2);
        assert_eq!(MessageRepo::count_by_device(&conn, "dev_b").unwrap(), 1);
    }
}
