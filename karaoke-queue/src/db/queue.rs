//! Queue entry database operations
//!
//! Row-level reads and writes for `queue_entries`. Every write stamps a
//! fresh `updated_at` via [`time::next_stamp`], because reorder uses that
//! column as its optimistic-concurrency token.
//!
//! Ordering within an event is `position`, then `created_at`, then
//! `queue_id`, so ties left by a crashed writer still sort deterministically.

use chrono::{DateTime, Utc};
use karaoke_common::db::{HoldReason, QueueEntry, SingerList};
use karaoke_common::uuid_utils::parse_column;
use karaoke_common::{time, Error, Result};
use sqlx::SqliteConnection;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct QueueEntryRow {
    queue_id: String,
    event_id: String,
    song_id: String,
    requestor: String,
    singers: String,
    position: i64,
    is_active: bool,
    was_skipped: bool,
    is_currently_playing: bool,
    is_on_break: bool,
    held_by_dj: bool,
    hold_reason: String,
    sung_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<QueueEntryRow> for QueueEntry {
    type Error = Error;

    fn try_from(row: QueueEntryRow) -> Result<Self> {
        Ok(QueueEntry {
            queue_id: parse_column(&row.queue_id, "queue_entries.queue_id")?,
            event_id: parse_column(&row.event_id, "queue_entries.event_id")?,
            song_id: parse_column(&row.song_id, "queue_entries.song_id")?,
            requestor: row.requestor,
            singers: SingerList::from_json(&row.singers)?,
            position: row.position,
            is_active: row.is_active,
            was_skipped: row.was_skipped,
            is_currently_playing: row.is_currently_playing,
            is_on_break: row.is_on_break,
            held_by_dj: row.held_by_dj,
            hold_reason: row.hold_reason.parse::<HoldReason>()?,
            sung_at: row.sung_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_ENTRY: &str = r#"
    SELECT queue_id, event_id, song_id, requestor, singers, position,
           is_active, was_skipped, is_currently_playing, is_on_break, held_by_dj,
           hold_reason, sung_at, created_at, updated_at
    FROM queue_entries
"#;

const ORDER_BY_POSITION: &str = "ORDER BY position ASC, created_at ASC, queue_id ASC";

/// Reorderable subset predicate: unsung, not playing, not archived
const REORDERABLE: &str = "sung_at IS NULL AND is_currently_playing = 0 AND is_active = 1";

async fn fetch_entries(
    conn: &mut SqliteConnection,
    filter: &str,
    event_id: Uuid,
) -> Result<Vec<QueueEntry>> {
    let sql = format!("{} WHERE event_id = ? AND {} {}", SELECT_ENTRY, filter, ORDER_BY_POSITION);
    let rows = sqlx::query_as::<_, QueueEntryRow>(&sql)
        .bind(event_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    rows.into_iter().map(QueueEntry::try_from).collect()
}

// ============================================================================
// Reads
// ============================================================================

/// Get a single entry, scoped to its event
pub async fn get_entry(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    queue_id: Uuid,
) -> Result<Option<QueueEntry>> {
    let sql = format!("{} WHERE event_id = ? AND queue_id = ?", SELECT_ENTRY);
    let row = sqlx::query_as::<_, QueueEntryRow>(&sql)
        .bind(event_id.to_string())
        .bind(queue_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.map(QueueEntry::try_from).transpose()
}

/// Like [`get_entry`] but missing (or belonging to another event) is `NotFound`
pub async fn require_entry(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    queue_id: Uuid,
) -> Result<QueueEntry> {
    get_entry(conn, event_id, queue_id).await?.ok_or_else(|| {
        Error::NotFound(format!("Queue entry {} in event {}", queue_id, event_id))
    })
}

/// Every entry of an event in position order
pub async fn entries_for_event(conn: &mut SqliteConnection, event_id: Uuid) -> Result<Vec<QueueEntry>> {
    fetch_entries(conn, "1 = 1", event_id).await
}

/// The reorderable subset in position order
pub async fn reorderable_entries(
    conn: &mut SqliteConnection,
    event_id: Uuid,
) -> Result<Vec<QueueEntry>> {
    fetch_entries(conn, REORDERABLE, event_id).await
}

/// Entries an autoplay pass scans, in position order
pub async fn autoplay_candidates(
    conn: &mut SqliteConnection,
    event_id: Uuid,
) -> Result<Vec<QueueEntry>> {
    let filter = format!("{} AND was_skipped = 0", REORDERABLE);
    fetch_entries(conn, &filter, event_id).await
}

pub async fn playing_entries(conn: &mut SqliteConnection, event_id: Uuid) -> Result<Vec<QueueEntry>> {
    fetch_entries(conn, "is_currently_playing = 1", event_id).await
}

/// Entries that count against a requestor's request limit
pub async fn count_unplayed_for_requestor(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    requestor: &str,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM queue_entries
        WHERE event_id = ? AND requestor = ? AND sung_at IS NULL AND is_active = 1
        "#,
    )
    .bind(event_id.to_string())
    .bind(requestor)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}

// ============================================================================
// Writes
// ============================================================================

pub async fn insert_entry(conn: &mut SqliteConnection, entry: &QueueEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO queue_entries (
            queue_id, event_id, song_id, requestor, singers, position,
            is_active, was_skipped, is_currently_playing, is_on_break, held_by_dj,
            hold_reason, sung_at, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.queue_id.to_string())
    .bind(entry.event_id.to_string())
    .bind(entry.song_id.to_string())
    .bind(&entry.requestor)
    .bind(entry.singers.to_json())
    .bind(entry.position)
    .bind(entry.is_active)
    .bind(entry.was_skipped)
    .bind(entry.is_currently_playing)
    .bind(entry.is_on_break)
    .bind(entry.held_by_dj)
    .bind(entry.hold_reason.as_str())
    .bind(entry.sung_at)
    .bind(entry.created_at)
    .bind(entry.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Make `entry` the playing entry and lift any hold on it
///
/// The caller must already have cleared every other playing entry of the
/// event; the partial unique index rejects a second one.
pub async fn mark_playing(conn: &mut SqliteConnection, entry: &QueueEntry) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE queue_entries
        SET is_currently_playing = 1, is_on_break = 0, held_by_dj = 0,
            hold_reason = 'None', updated_at = ?
        WHERE queue_id = ?
        "#,
    )
    .bind(time::next_stamp(entry.updated_at))
    .bind(entry.queue_id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Interrupt a playing entry without finishing it
///
/// The entry returns to the reorderable subset at the front.
pub async fn clear_playing(conn: &mut SqliteConnection, entry: &QueueEntry) -> Result<()> {
    sqlx::query(
        "UPDATE queue_entries SET is_currently_playing = 0, position = 0, updated_at = ? WHERE queue_id = ?",
    )
    .bind(time::next_stamp(entry.updated_at))
    .bind(entry.queue_id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Finish an entry (skip or complete): stamps `sung_at`, clears playing and hold
pub async fn mark_finished(
    conn: &mut SqliteConnection,
    entry: &QueueEntry,
    skipped: bool,
    sung_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE queue_entries
        SET is_currently_playing = 0, was_skipped = ?, sung_at = ?,
            is_on_break = 0, held_by_dj = 0, hold_reason = 'None', updated_at = ?
        WHERE queue_id = ?
        "#,
    )
    .bind(skipped)
    .bind(sung_at)
    .bind(time::next_stamp(entry.updated_at))
    .bind(entry.queue_id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Persist hold state
pub async fn set_hold(
    conn: &mut SqliteConnection,
    entry: &QueueEntry,
    is_on_break: bool,
    held_by_dj: bool,
    reason: HoldReason,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE queue_entries
        SET is_on_break = ?, held_by_dj = ?, hold_reason = ?, updated_at = ?
        WHERE queue_id = ?
        "#,
    )
    .bind(is_on_break)
    .bind(held_by_dj)
    .bind(reason.as_str())
    .bind(time::next_stamp(entry.updated_at))
    .bind(entry.queue_id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn set_position(conn: &mut SqliteConnection, entry: &QueueEntry, position: i64) -> Result<()> {
    sqlx::query("UPDATE queue_entries SET position = ?, updated_at = ? WHERE queue_id = ?")
        .bind(position)
        .bind(time::next_stamp(entry.updated_at))
        .bind(entry.queue_id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn delete_entry(conn: &mut SqliteConnection, queue_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM queue_entries WHERE queue_id = ?")
        .bind(queue_id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Deactivate every active entry of an event
///
/// Returns the number of entries archived.
pub async fn archive_event_entries(conn: &mut SqliteConnection, event_id: Uuid) -> Result<usize> {
    let active = fetch_entries(conn, "is_active = 1", event_id).await?;
    for entry in &active {
        sqlx::query(
            "UPDATE queue_entries SET is_active = 0, is_currently_playing = 0, updated_at = ? WHERE queue_id = ?",
        )
        .bind(time::next_stamp(entry.updated_at))
        .bind(entry.queue_id.to_string())
        .execute(&mut *conn)
        .await?;
    }

    Ok(active.len())
}

// ============================================================================
// Position maintenance
// ============================================================================

/// Number `ordered` as positions 1..N
///
/// Only rows whose position actually changes are written. Returns the
/// number of rows written.
pub async fn apply_order(conn: &mut SqliteConnection, ordered: &[QueueEntry]) -> Result<usize> {
    let mut written = 0;
    for (index, entry) in ordered.iter().enumerate() {
        let position = index as i64 + 1;
        if entry.position != position {
            set_position(conn, entry, position).await?;
            written += 1;
        }
    }
    Ok(written)
}

/// Restore the dense 1..N numbering of the reorderable subset
pub async fn compact_positions(conn: &mut SqliteConnection, event_id: Uuid) -> Result<usize> {
    let subset = reorderable_entries(conn, event_id).await?;
    let written = apply_order(conn, &subset).await?;
    if written > 0 {
        tracing::debug!(event_id = %event_id, written, "Compacted queue positions");
    }
    Ok(written)
}
