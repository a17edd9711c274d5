//! Attendance tracking and hold re-evaluation
//!
//! Attendance is the source of truth for singer availability. Every change
//! re-resolves the holds of that singer's reorderable entries in the same
//! transaction, using the same first-fail rule as autoplay.

use super::hold::{attendance_hold, hold_differs, AttendanceMap};
use super::Collaborators;
use crate::db;
use crate::utils::db_retry::retry_on_lock;
use chrono::{DateTime, Utc};
use karaoke_common::db::{AttendanceRecord, QueueEntry};
use karaoke_common::events::{Notification, QueueAction};
use karaoke_common::{time, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

/// Explicit flag values set by a DJ override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingerStatus {
    pub is_logged_in: bool,
    pub is_joined: bool,
    pub is_on_break: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceChange {
    CheckIn,
    CheckOut,
    StartBreak,
    EndBreak,
    SetStatus(SingerStatus),
}

impl AttendanceChange {
    fn name(&self) -> &'static str {
        match self {
            AttendanceChange::CheckIn => "check-in",
            AttendanceChange::CheckOut => "check-out",
            AttendanceChange::StartBreak => "start break",
            AttendanceChange::EndBreak => "end break",
            AttendanceChange::SetStatus(_) => "set singer status",
        }
    }
}

/// Compute the record that results from `change`
///
/// Break timestamps follow the on-break flag: entering a break stamps
/// `break_started_at`, leaving one stamps `break_ended_at`.
pub fn apply_change(
    current: Option<&AttendanceRecord>,
    change: AttendanceChange,
    event_id: Uuid,
    singer_id: &str,
    now: DateTime<Utc>,
) -> Result<AttendanceRecord> {
    let mut record = match current {
        Some(existing) => existing.clone(),
        None => AttendanceRecord {
            event_id,
            singer_id: singer_id.to_string(),
            is_logged_in: false,
            is_joined: false,
            is_on_break: false,
            break_started_at: None,
            break_ended_at: None,
            updated_at: now,
        },
    };
    let was_on_break = record.is_on_break;

    let on_break = match change {
        AttendanceChange::CheckIn => {
            record.is_logged_in = true;
            record.is_joined = true;
            false
        }
        AttendanceChange::CheckOut => {
            record.is_joined = false;
            false
        }
        AttendanceChange::StartBreak => {
            if !record.is_joined {
                return Err(Error::InvalidStateTransition(format!(
                    "Singer {} is not checked in",
                    singer_id
                )));
            }
            if record.is_on_break {
                return Err(Error::InvalidStateTransition(format!(
                    "Singer {} is already on break",
                    singer_id
                )));
            }
            true
        }
        AttendanceChange::EndBreak => {
            if !record.is_on_break {
                return Err(Error::InvalidStateTransition(format!(
                    "Singer {} is not on break",
                    singer_id
                )));
            }
            false
        }
        AttendanceChange::SetStatus(status) => {
            record.is_logged_in = status.is_logged_in;
            record.is_joined = status.is_joined;
            status.is_on_break
        }
    };

    record.is_on_break = on_break;
    if on_break && !was_on_break {
        record.break_started_at = Some(now);
        record.break_ended_at = None;
    } else if !on_break && was_on_break {
        record.break_ended_at = Some(now);
    }

    if let Some(existing) = current {
        record.updated_at = time::next_stamp(existing.updated_at).max(now);
    }

    Ok(record)
}

/// Persist the attendance hold of one entry if it changed
///
/// Returns `OnHold` or `Released` for a changed entry. Entries outside
/// attendance control (DJ-held, playing, finished) are left untouched.
pub(crate) async fn sync_entry_hold(
    conn: &mut SqliteConnection,
    entry: &QueueEntry,
    attendance: &AttendanceMap,
) -> Result<Option<Notification>> {
    let Some(reason) = attendance_hold(entry, attendance) else {
        return Ok(None);
    };
    if !hold_differs(entry, reason) {
        return Ok(None);
    }

    let blocked = reason.is_blocking();
    db::queue::set_hold(conn, entry, blocked, false, reason).await?;
    Ok(Some(if blocked {
        Notification::held(entry.event_id, entry.queue_id, reason)
    } else {
        Notification::queue_entry(entry.event_id, entry.queue_id, QueueAction::Released)
    }))
}

/// Re-resolve the holds of one singer's reorderable entries
pub(crate) async fn refresh_holds_for_singer(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    singer_id: &str,
) -> Result<Vec<Notification>> {
    let attendance = db::attendance::records_for_event(conn, event_id).await?;
    let mut notifications = Vec::new();

    for entry in db::queue::reorderable_entries(conn, event_id).await? {
        if !entry.singers.contains(singer_id) {
            continue;
        }
        if let Some(notification) = sync_entry_hold(conn, &entry, &attendance).await? {
            notifications.push(notification);
        }
    }

    Ok(notifications)
}

/// Move `front` to the head of the reorderable subset, keeping relative order
async fn move_to_front(conn: &mut SqliteConnection, event_id: Uuid, front: &[Uuid]) -> Result<usize> {
    let subset = db::queue::reorderable_entries(conn, event_id).await?;
    let (mut ordered, rest): (Vec<QueueEntry>, Vec<QueueEntry>) = subset
        .into_iter()
        .partition(|e| front.contains(&e.queue_id));
    ordered.extend(rest);
    db::queue::apply_order(conn, &ordered).await
}

pub struct AttendanceTracker<'a> {
    deps: Collaborators<'a>,
}

impl<'a> AttendanceTracker<'a> {
    pub(crate) fn new(deps: Collaborators<'a>) -> Self {
        Self { deps }
    }

    pub async fn check_in(&self, event_id: Uuid, singer_id: &str) -> Result<AttendanceRecord> {
        self.apply(event_id, singer_id, AttendanceChange::CheckIn).await
    }

    pub async fn check_out(&self, event_id: Uuid, singer_id: &str) -> Result<AttendanceRecord> {
        self.apply(event_id, singer_id, AttendanceChange::CheckOut).await
    }

    pub async fn start_break(&self, event_id: Uuid, singer_id: &str) -> Result<AttendanceRecord> {
        self.apply(event_id, singer_id, AttendanceChange::StartBreak).await
    }

    /// End a break; entries held by attendance move to the front of the queue
    pub async fn end_break(&self, event_id: Uuid, singer_id: &str) -> Result<AttendanceRecord> {
        self.apply(event_id, singer_id, AttendanceChange::EndBreak).await
    }

    pub async fn set_status(
        &self,
        event_id: Uuid,
        singer_id: &str,
        status: SingerStatus,
    ) -> Result<AttendanceRecord> {
        self.apply(event_id, singer_id, AttendanceChange::SetStatus(status))
            .await
    }

    pub async fn apply(
        &self,
        event_id: Uuid,
        singer_id: &str,
        change: AttendanceChange,
    ) -> Result<AttendanceRecord> {
        retry_on_lock(change.name(), self.deps.settings.max_lock_wait_ms, move || {
            self.try_apply(event_id, singer_id, change)
        })
        .await
    }

    async fn try_apply(
        &self,
        event_id: Uuid,
        singer_id: &str,
        change: AttendanceChange,
    ) -> Result<AttendanceRecord> {
        let _guard = self.deps.locks.acquire(event_id).await?;
        let mut tx = self.deps.db.begin().await?;

        db::events::require_open_event(&mut *tx, event_id).await?;
        let singer = db::singers::require_singer(&mut *tx, singer_id).await?;
        let current = db::attendance::get_record(&mut *tx, event_id, singer_id).await?;
        let record = apply_change(current.as_ref(), change, event_id, singer_id, time::now())?;

        // Entries this singer's break was holding; only those released by the
        // refresh below move to the front
        let was_held: Vec<Uuid> = if change == AttendanceChange::EndBreak {
            db::queue::reorderable_entries(&mut *tx, event_id)
                .await?
                .into_iter()
                .filter(|e| e.singers.contains(singer_id) && e.is_on_break && !e.held_by_dj)
                .map(|e| e.queue_id)
                .collect()
        } else {
            Vec::new()
        };

        db::attendance::upsert_record(&mut *tx, &record).await?;

        let mut notifications = vec![Notification::SingerStatusUpdated {
            singer_id: singer.singer_id.clone(),
            event_id,
            display_name: singer.display_name.clone(),
            is_logged_in: record.is_logged_in,
            is_joined: record.is_joined,
            is_on_break: record.is_on_break,
            timestamp: time::now(),
        }];
        notifications.extend(refresh_holds_for_singer(&mut *tx, event_id, singer_id).await?);

        let front: Vec<Uuid> = if was_held.is_empty() {
            Vec::new()
        } else {
            db::queue::reorderable_entries(&mut *tx, event_id)
                .await?
                .into_iter()
                .filter(|e| was_held.contains(&e.queue_id) && !e.is_on_break)
                .map(|e| e.queue_id)
                .collect()
        };

        if !front.is_empty() {
            let moved = move_to_front(&mut *tx, event_id, &front).await?;
            info!(event_id = %event_id, singer_id, moved, "Returning singer's held entries moved to front");
            notifications.push(Notification::reordered(event_id));
        }

        tx.commit().await?;

        info!(
            event_id = %event_id,
            singer_id,
            change = change.name(),
            is_logged_in = record.is_logged_in,
            is_joined = record.is_joined,
            is_on_break = record.is_on_break,
            "Attendance updated"
        );
        self.deps.notifier.publish_all(notifications);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked_in(now: DateTime<Utc>) -> AttendanceRecord {
        apply_change(None, AttendanceChange::CheckIn, Uuid::nil(), "alice", now).unwrap()
    }

    #[test]
    fn test_check_in_creates_available_record() {
        let record = checked_in(Utc::now());
        assert!(record.is_logged_in && record.is_joined && !record.is_on_break);
    }

    #[test]
    fn test_break_requires_check_in() {
        let err = apply_change(None, AttendanceChange::StartBreak, Uuid::nil(), "alice", Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStateTransition(_)));
    }

    #[test]
    fn test_end_break_requires_break() {
        let record = checked_in(Utc::now());
        let err = apply_change(
            Some(&record),
            AttendanceChange::EndBreak,
            Uuid::nil(),
            "alice",
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidStateTransition(_)));
    }

    #[test]
    fn test_break_timestamps_follow_flag() {
        let start = Utc::now();
        let record = checked_in(start);
        let on_break = apply_change(
            Some(&record),
            AttendanceChange::StartBreak,
            Uuid::nil(),
            "alice",
            start,
        )
        .unwrap();
        assert_eq!(on_break.break_started_at, Some(start));
        assert!(on_break.break_ended_at.is_none());
        assert!(on_break.updated_at > record.updated_at);

        let end = start + chrono::Duration::minutes(10);
        let back = apply_change(
            Some(&on_break),
            AttendanceChange::EndBreak,
            Uuid::nil(),
            "alice",
            end,
        )
        .unwrap();
        assert!(!back.is_on_break);
        assert_eq!(back.break_started_at, Some(start));
        assert_eq!(back.break_ended_at, Some(end));
    }

    #[test]
    fn test_check_out_ends_break_and_unjoins() {
        let now = Utc::now();
        let on_break = apply_change(
            Some(&checked_in(now)),
            AttendanceChange::StartBreak,
            Uuid::nil(),
            "alice",
            now,
        )
        .unwrap();
        let out = apply_change(
            Some(&on_break),
            AttendanceChange::CheckOut,
            Uuid::nil(),
            "alice",
            now,
        )
        .unwrap();
        assert!(!out.is_joined);
        assert!(!out.is_on_break);
        assert!(out.is_logged_in);
        assert!(out.break_ended_at.is_some());
    }

    #[test]
    fn test_set_status_override() {
        let status = SingerStatus {
            is_logged_in: false,
            is_joined: true,
            is_on_break: true,
        };
        let record = apply_change(
            None,
            AttendanceChange::SetStatus(status),
            Uuid::nil(),
            "alice",
            Utc::now(),
        )
        .unwrap();
        assert!(!record.is_logged_in);
        assert!(record.is_joined);
        assert!(record.is_on_break);
        assert!(record.break_started_at.is_some());
    }
}
