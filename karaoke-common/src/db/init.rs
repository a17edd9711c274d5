//! Database initialization
//!
//! Creates the SQLite database on first run and applies the schema
//! idempotently (`CREATE TABLE IF NOT EXISTS`) on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Schema version written to `schema_version` on a fresh database
pub const SCHEMA_VERSION: i64 = 1;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // WAL allows concurrent readers alongside the single writer; the busy
    // timeout is kept short so contention surfaces to the retry layer.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(250));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// Limited to a single connection that never expires: every pooled
/// connection to `sqlite::memory:` would otherwise see its own empty database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_events_table(pool).await?;
    create_singers_table(pool).await?;
    create_songs_table(pool).await?;
    create_attendance_table(pool).await?;
    create_queue_entries_table(pool).await?;
    debug!("Database schema verified");
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            event_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Upcoming'
                CHECK (status IN ('Upcoming', 'Live', 'Archived')),
            request_limit INTEGER NOT NULL CHECK (request_limit >= 1),
            songs_completed INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_singers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS singers (
            singer_id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            song_id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            media_ref TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_attendance_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            event_id TEXT NOT NULL REFERENCES events(event_id),
            singer_id TEXT NOT NULL REFERENCES singers(singer_id),
            is_logged_in INTEGER NOT NULL DEFAULT 0,
            is_joined INTEGER NOT NULL DEFAULT 0,
            is_on_break INTEGER NOT NULL DEFAULT 0,
            break_started_at TIMESTAMP,
            break_ended_at TIMESTAMP,
            updated_at TIMESTAMP NOT NULL,
            PRIMARY KEY (event_id, singer_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_queue_entries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS queue_entries (
            queue_id TEXT PRIMARY KEY,
            event_id TEXT NOT NULL REFERENCES events(event_id),
            song_id TEXT NOT NULL REFERENCES songs(song_id),
            requestor TEXT NOT NULL REFERENCES singers(singer_id),
            singers TEXT NOT NULL,
            position INTEGER NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            was_skipped INTEGER NOT NULL DEFAULT 0,
            is_currently_playing INTEGER NOT NULL DEFAULT 0,
            is_on_break INTEGER NOT NULL DEFAULT 0,
            held_by_dj INTEGER NOT NULL DEFAULT 0,
            hold_reason TEXT NOT NULL DEFAULT 'None',
            sung_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_queue_entries_event_position ON queue_entries(event_id, position)",
    )
    .execute(pool)
    .await?;

    // Backstop for the at-most-one-playing invariant: a transition that
    // forgets to clear the previous entry fails instead of committing.
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_queue_entries_one_playing
        ON queue_entries(event_id) WHERE is_currently_playing = 1
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
