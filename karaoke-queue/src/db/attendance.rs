//! Attendance records
//!
//! One row per (event, singer), overwritten in place and never deleted.

use chrono::{DateTime, Utc};
use karaoke_common::db::AttendanceRecord;
use karaoke_common::uuid_utils::parse_column;
use karaoke_common::{Error, Result};
use sqlx::SqliteConnection;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct AttendanceRow {
    event_id: String,
    singer_id: String,
    is_logged_in: bool,
    is_joined: bool,
    is_on_break: bool,
    break_started_at: Option<DateTime<Utc>>,
    break_ended_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = Error;

    fn try_from(row: AttendanceRow) -> Result<Self> {
        Ok(AttendanceRecord {
            event_id: parse_column(&row.event_id, "attendance.event_id")?,
            singer_id: row.singer_id,
            is_logged_in: row.is_logged_in,
            is_joined: row.is_joined,
            is_on_break: row.is_on_break,
            break_started_at: row.break_started_at,
            break_ended_at: row.break_ended_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_ATTENDANCE: &str = r#"
    SELECT event_id, singer_id, is_logged_in, is_joined, is_on_break,
           break_started_at, break_ended_at, updated_at
    FROM attendance
"#;

pub async fn get_record(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    singer_id: &str,
) -> Result<Option<AttendanceRecord>> {
    let sql = format!("{} WHERE event_id = ? AND singer_id = ?", SELECT_ATTENDANCE);
    let row = sqlx::query_as::<_, AttendanceRow>(&sql)
        .bind(event_id.to_string())
        .bind(singer_id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(AttendanceRecord::try_from).transpose()
}

/// All attendance of an event, keyed by singer id
pub async fn records_for_event(
    conn: &mut SqliteConnection,
    event_id: Uuid,
) -> Result<HashMap<String, AttendanceRecord>> {
    let sql = format!("{} WHERE event_id = ?", SELECT_ATTENDANCE);
    let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
        .bind(event_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    rows.into_iter()
        .map(|row| AttendanceRecord::try_from(row).map(|r| (r.singer_id.clone(), r)))
        .collect()
}

/// Insert the record or overwrite every flag of the existing one
pub async fn upsert_record(conn: &mut SqliteConnection, record: &AttendanceRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO attendance (
            event_id, singer_id, is_logged_in, is_joined, is_on_break,
            break_started_at, break_ended_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(event_id, singer_id) DO UPDATE SET
            is_logged_in = excluded.is_logged_in,
            is_joined = excluded.is_joined,
            is_on_break = excluded.is_on_break,
            break_started_at = excluded.break_started_at,
            break_ended_at = excluded.break_ended_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(record.event_id.to_string())
    .bind(&record.singer_id)
    .bind(record.is_logged_in)
    .bind(record.is_joined)
    .bind(record.is_on_break)
    .bind(record.break_started_at)
    .bind(record.break_ended_at)
    .bind(record.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
