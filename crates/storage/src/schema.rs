use rusqlite::Connection;

use crate::error::StorageError;

pub const DEFAULT_TABLE: &str = "foo";

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

// Timestamps are stored as UTC text in `%Y-%m-%d %H:%M:%S`.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS foo (
    id INTEGER PRIMARY KEY,
    memo TEXT NOT NULL,
    created TEXT NOT NULL,
    updated TEXT CHECK (updated IS NULL OR updated >= created)
);
CREATE INDEX IF NOT EXISTS idx_foo_created ON foo (created);
";
