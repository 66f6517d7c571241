//! Database schema and migrations.

use rusqlite::Connection;

use crate::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub fn initialize(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;

    if version == 0 {
        // Fresh database - create all tables
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if version < SCHEMA_VERSION {
        // Run migrations
        migrate(conn, version)?;
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    // Check if the schema_version table exists
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;

    Ok(version)
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
        [version],
    )?;
    Ok(())
}

/// Create the initial schema (version 1).
fn create_schema_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- Primary encrypted records. The timestamp stays in the clear for
        -- range queries; temperature/humidity live inside the ciphertext.
        CREATE TABLE IF NOT EXISTS records (
            id INTEGER PRIMARY KEY,
            timestamp INTEGER NOT NULL,
            iv BLOB NOT NULL,
            ciphertext BLOB NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_records_timestamp
            ON records(timestamp);

        -- Backup snapshots (append-only, resealed copies of records)
        CREATE TABLE IF NOT EXISTS backup_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            record_id INTEGER NOT NULL,
            timestamp INTEGER NOT NULL,
            iv BLOB NOT NULL,
            ciphertext BLOB NOT NULL,
            backup_timestamp INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_backup_timestamp
            ON backup_records(timestamp);

        -- Hourly roll-up buckets, keyed by bucket start
        CREATE TABLE IF NOT EXISTS aggregates (
            bucket_start INTEGER PRIMARY KEY,
            avg_temperature REAL NOT NULL,
            avg_humidity REAL NOT NULL,
            min_temperature REAL NOT NULL,
            max_temperature REAL NOT NULL,
            min_humidity REAL NOT NULL,
            max_humidity REAL NOT NULL,
            sample_count INTEGER NOT NULL
        );
        "#,
    )?;

    Ok(())
}

/// Run migrations from old_version to current.
fn migrate(conn: &Connection, old_version: i32) -> Result<()> {
    // Add future migrations here
    // if old_version < 2 { migrate_to_v2(conn)?; }

    let _ = old_version; // Suppress unused warning
    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}
