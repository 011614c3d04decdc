//! Database schema migrations.
//!
//! Applies the initial schema: the bot_meta cursor table, per-user key/value
//! records, the append-only message log, and the keyword index.

use rusqlite::Connection;
use tracing::info;

use crate::error::StoreError;

/// Run all pending database migrations.
///
/// Each version is applied once, in order, and recorded in `schema_migrations`.
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| StoreError::Fatal(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::Fatal(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    if current_version < 2 {
        apply_v2(conn)?;
        info!("Applied migration v2: keyword_index_by_message");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        -- Process-wide metadata. Holds the update cursor under 'update_offset'.
        CREATE TABLE IF NOT EXISTS bot_meta (
            meta_key        TEXT PRIMARY KEY NOT NULL,
            value           INTEGER NOT NULL,
            updated_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        -- Per-user key/value records.
        CREATE TABLE IF NOT EXISTS user_data (
            user_id         INTEGER NOT NULL,
            item_key        TEXT NOT NULL,
            value           TEXT NOT NULL,
            updated_at      INTEGER NOT NULL,
            PRIMARY KEY (user_id, item_key)
        );

        -- Append-only message log.
        CREATE TABLE IF NOT EXISTS user_messages (
            message_id      TEXT PRIMARY KEY NOT NULL,
            user_id         INTEGER NOT NULL,
            created_at      INTEGER NOT NULL,
            update_id       INTEGER NOT NULL,
            text            TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_user_messages_user_created
            ON user_messages (user_id, created_at DESC, update_id DESC);

        -- Inverted keyword index.
        CREATE TABLE IF NOT EXISTS keyword_index (
            keyword         TEXT NOT NULL,
            message_id      TEXT NOT NULL,
            user_id         INTEGER NOT NULL,
            created_at      INTEGER NOT NULL,
            user_created    TEXT NOT NULL,
            snippet         TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (keyword, message_id)
        );

        CREATE INDEX IF NOT EXISTS idx_keyword_index_sort
            ON keyword_index (keyword, user_id, created_at, message_id);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| StoreError::Fatal(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}

/// Version 2: look up index entries by message, for re-indexing edits.
fn apply_v2(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_keyword_index_message
            ON keyword_index (message_id);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (2, 'keyword_index_by_message');
        ",
    )
    .map_err(|e| StoreError::Fatal(format!("Failed to apply migration v2: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_conn() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    #[test]
    fn test_migrations_run_once() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn test_tables_exist() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();
        for table in ["bot_meta", "user_data", "user_messages", "keyword_index"] {
            assert!(table_exists(&conn, table), "missing table {}", table);
        }
    }

    #[test]
    fn test_user_data_key_is_unique_per_user() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO user_data (user_id, item_key, value, updated_at) VALUES (1, 'k', 'a', 0)",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO user_data (user_id, item_key, value, updated_at) VALUES (1, 'k', 'b', 0)",
            [],
        );
        assert!(dup.is_err());
        conn.execute(
            "INSERT INTO user_data (user_id, item_key, value, updated_at) VALUES (2, 'k', 'b', 0)",
            [],
        )
        .unwrap();
    }
}
