//! Event table operations

use chrono::{DateTime, Utc};
use karaoke_common::db::{Event, EventStatus};
use karaoke_common::uuid_utils::parse_column;
use karaoke_common::{Error, Result};
use sqlx::SqliteConnection;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct EventRow {
    event_id: String,
    name: String,
    status: String,
    request_limit: i64,
    songs_completed: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = Error;

    fn try_from(row: EventRow) -> Result<Self> {
        Ok(Event {
            event_id: parse_column(&row.event_id, "events.event_id")?,
            name: row.name,
            status: row.status.parse()?,
            request_limit: row.request_limit,
            songs_completed: row.songs_completed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub async fn insert_event(conn: &mut SqliteConnection, event: &Event) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO events (event_id, name, status, request_limit, songs_completed, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(event.event_id.to_string())
    .bind(&event.name)
    .bind(event.status.as_str())
    .bind(event.request_limit)
    .bind(event.songs_completed)
    .bind(event.created_at)
    .bind(event.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn get_event(conn: &mut SqliteConnection, event_id: Uuid) -> Result<Option<Event>> {
    let row = sqlx::query_as::<_, EventRow>(
        r#"
        SELECT event_id, name, status, request_limit, songs_completed, created_at, updated_at
        FROM events
        WHERE event_id = ?
        "#,
    )
    .bind(event_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Event::try_from).transpose()
}

/// Like [`get_event`] but a missing event is `NotFound`
pub async fn require_event(conn: &mut SqliteConnection, event_id: Uuid) -> Result<Event> {
    get_event(conn, event_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Event {}", event_id)))
}

/// Require an event that still accepts queue changes
pub async fn require_open_event(conn: &mut SqliteConnection, event_id: Uuid) -> Result<Event> {
    let event = require_event(conn, event_id).await?;
    if event.status == EventStatus::Archived {
        return Err(Error::InvalidStateTransition(format!(
            "Event {} is archived",
            event_id
        )));
    }
    Ok(event)
}

pub async fn set_status(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    status: EventStatus,
    stamp: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE events SET status = ?, updated_at = ? WHERE event_id = ?")
        .bind(status.as_str())
        .bind(stamp)
        .bind(event_id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn increment_songs_completed(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    stamp: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE events SET songs_completed = songs_completed + 1, updated_at = ? WHERE event_id = ?",
    )
    .bind(stamp)
    .bind(event_id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}
