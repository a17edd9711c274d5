//! Read-only queue projection for DJ console, big screen and singer apps

use super::hold::{with_current_hold, AttendanceMap};
use super::Collaborators;
use crate::db;
use chrono::{DateTime, Utc};
use karaoke_common::db::{HoldReason, QueueEntry, SingerList, Song};
use karaoke_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueFilter {
    #[default]
    Unplayed,
    Playing,
    Completed,
    All,
}

impl FromStr for QueueFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "unplayed" => Ok(QueueFilter::Unplayed),
            "playing" => Ok(QueueFilter::Playing),
            "completed" => Ok(QueueFilter::Completed),
            "all" => Ok(QueueFilter::All),
            other => Err(Error::ValidationFailed(format!("Unknown queue filter: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayStatus {
    Playing,
    Skipped,
    Sung,
    Held,
    Unplayed,
}

impl DisplayStatus {
    pub fn of(entry: &QueueEntry) -> Self {
        if entry.is_currently_playing {
            DisplayStatus::Playing
        } else if entry.was_skipped {
            DisplayStatus::Skipped
        } else if entry.sung_at.is_some() {
            DisplayStatus::Sung
        } else if entry.is_on_break {
            DisplayStatus::Held
        } else {
            DisplayStatus::Unplayed
        }
    }
}

/// One row of the queue as clients see it
#[derive(Debug, Clone, Serialize)]
pub struct QueueEntryView {
    pub queue_id: Uuid,
    pub song_id: Uuid,
    pub title: String,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
    pub requestor: String,
    pub singers: SingerList,
    pub position: i64,
    pub display_status: DisplayStatus,
    pub hold_reason: HoldReason,
    pub held_by_dj: bool,
    pub is_up_next: bool,
    pub sung_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Filter, order and decorate an event's entries
///
/// `entries` must be every entry of the event in position order; the
/// up-next marker is computed before filtering. Holds of waiting entries
/// are resolved against `attendance` rather than read from storage.
pub fn build_view(
    entries: Vec<QueueEntry>,
    songs: &HashMap<Uuid, Song>,
    attendance: &AttendanceMap,
    filter: QueueFilter,
) -> Result<Vec<QueueEntryView>> {
    let entries: Vec<QueueEntry> = entries
        .into_iter()
        .map(|e| with_current_hold(e, attendance))
        .collect();
    let up_next = entries
        .iter()
        .find(|e| e.is_reorderable() && DisplayStatus::of(e) == DisplayStatus::Unplayed)
        .map(|e| e.queue_id);

    let (mut finished, rest): (Vec<QueueEntry>, Vec<QueueEntry>) =
        entries.into_iter().partition(|e| e.sung_at.is_some());
    finished.sort_by_key(|e| e.sung_at);
    let (playing, rest): (Vec<QueueEntry>, Vec<QueueEntry>) =
        rest.into_iter().partition(|e| e.is_currently_playing);
    let (unplayed, archived): (Vec<QueueEntry>, Vec<QueueEntry>) =
        rest.into_iter().partition(|e| e.is_active);

    let selected: Vec<QueueEntry> = match filter {
        QueueFilter::Unplayed => unplayed,
        QueueFilter::Playing => playing,
        QueueFilter::Completed => finished,
        QueueFilter::All => playing
            .into_iter()
            .chain(unplayed)
            .chain(finished)
            .chain(archived)
            .collect(),
    };

    selected
        .into_iter()
        .map(|entry| -> Result<QueueEntryView> {
            let song = songs.get(&entry.song_id).ok_or_else(|| {
                Error::Internal(format!(
                    "Queue entry {} references missing song {}",
                    entry.queue_id, entry.song_id
                ))
            })?;
            Ok(QueueEntryView {
                queue_id: entry.queue_id,
                song_id: entry.song_id,
                title: song.title.clone(),
                artist: song.artist.clone(),
                media_ref: song.media_ref.clone(),
                display_status: DisplayStatus::of(&entry),
                is_up_next: Some(entry.queue_id) == up_next,
                requestor: entry.requestor,
                singers: entry.singers,
                position: entry.position,
                hold_reason: entry.hold_reason,
                held_by_dj: entry.held_by_dj,
                sung_at: entry.sung_at,
                updated_at: entry.updated_at,
            })
        })
        .collect()
}

pub struct QueueView<'a> {
    deps: Collaborators<'a>,
}

impl<'a> QueueView<'a> {
    pub(crate) fn new(deps: Collaborators<'a>) -> Self {
        Self { deps }
    }

    pub async fn get_queue(&self, event_id: Uuid, filter: QueueFilter) -> Result<Vec<QueueEntryView>> {
        let mut conn = self.deps.db.acquire().await?;
        db::events::require_event(&mut *conn, event_id).await?;
        let entries = db::queue::entries_for_event(&mut *conn, event_id).await?;
        let songs = db::songs::songs_for_event(&mut *conn, event_id).await?;
        let attendance = db::attendance::records_for_event(&mut *conn, event_id).await?;
        build_view(entries, &songs, &attendance, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use karaoke_common::db::AttendanceRecord;

    fn song(song_id: Uuid) -> Song {
        Song {
            song_id,
            title: "Bohemian Rhapsody".to_string(),
            artist: "Queen".to_string(),
            media_ref: None,
        }
    }

    fn entry(position: i64) -> QueueEntry {
        entry_for("alice", position)
    }

    fn entry_for(singer: &str, position: i64) -> QueueEntry {
        let now = Utc::now();
        QueueEntry {
            queue_id: Uuid::new_v4(),
            event_id: Uuid::nil(),
            song_id: Uuid::new_v4(),
            requestor: singer.to_string(),
            singers: SingerList::solo(singer).unwrap(),
            position,
            is_active: true,
            was_skipped: false,
            is_currently_playing: false,
            is_on_break: false,
            held_by_dj: false,
            hold_reason: HoldReason::None,
            sung_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn attendance(present: &[&str], on_break: &[&str]) -> AttendanceMap {
        present
            .iter()
            .map(|singer| {
                let record = AttendanceRecord {
                    event_id: Uuid::nil(),
                    singer_id: singer.to_string(),
                    is_logged_in: true,
                    is_joined: true,
                    is_on_break: on_break.contains(singer),
                    break_started_at: None,
                    break_ended_at: None,
                    updated_at: Utc::now(),
                };
                (singer.to_string(), record)
            })
            .collect()
    }

    fn catalog(entries: &[QueueEntry]) -> HashMap<Uuid, Song> {
        entries.iter().map(|e| (e.song_id, song(e.song_id))).collect()
    }

    #[test]
    fn test_display_status_precedence() {
        let mut e = entry(1);
        assert_eq!(DisplayStatus::of(&e), DisplayStatus::Unplayed);
        e.is_on_break = true;
        assert_eq!(DisplayStatus::of(&e), DisplayStatus::Held);
        e.sung_at = Some(Utc::now());
        assert_eq!(DisplayStatus::of(&e), DisplayStatus::Sung);
        e.was_skipped = true;
        assert_eq!(DisplayStatus::of(&e), DisplayStatus::Skipped);
        e.is_currently_playing = true;
        assert_eq!(DisplayStatus::of(&e), DisplayStatus::Playing);
    }

    #[test]
    fn test_up_next_skips_held_entries() {
        let held = entry_for("bob", 1);
        let next = entry(2);
        let later = entry(3);
        let entries = vec![held, next.clone(), later];
        let songs = catalog(&entries);
        let present = attendance(&["alice", "bob"], &["bob"]);

        let view = build_view(entries, &songs, &present, QueueFilter::Unplayed).unwrap();
        let flags: Vec<bool> = view.iter().map(|v| v.is_up_next).collect();
        assert_eq!(flags, vec![false, true, false]);
        assert_eq!(view[1].queue_id, next.queue_id);
        assert_eq!(view[0].display_status, DisplayStatus::Held);
        assert_eq!(view[0].hold_reason, HoldReason::OnBreak);
    }

    #[test]
    fn test_stale_stored_hold_is_recomputed() {
        // Stored as free, but the singer never checked in
        let absent = entry_for("dave", 1);
        // Stored as held, but the singer is back
        let mut returned = entry(2);
        returned.is_on_break = true;
        returned.hold_reason = HoldReason::OnBreak;
        let entries = vec![absent.clone(), returned.clone()];
        let songs = catalog(&entries);

        let view =
            build_view(entries, &songs, &attendance(&["alice"], &[]), QueueFilter::Unplayed).unwrap();
        assert_eq!(view[0].display_status, DisplayStatus::Held);
        assert_eq!(view[0].hold_reason, HoldReason::NotJoined);
        assert!(!view[0].is_up_next);
        assert_eq!(view[1].display_status, DisplayStatus::Unplayed);
        assert!(view[1].is_up_next);
    }

    #[test]
    fn test_all_filter_orders_playing_unplayed_completed() {
        let start = Utc::now();
        let mut playing = entry(1);
        playing.is_currently_playing = true;
        let unplayed = entry(1);
        let mut sung_late = entry(2);
        sung_late.sung_at = Some(start + Duration::minutes(5));
        let mut sung_early = entry(3);
        sung_early.sung_at = Some(start);
        sung_early.was_skipped = true;

        let entries = vec![
            playing.clone(),
            unplayed.clone(),
            sung_late.clone(),
            sung_early.clone(),
        ];
        let songs = catalog(&entries);

        let view = build_view(
            entries,
            &songs,
            &attendance(&["alice"], &[]),
            QueueFilter::All,
        )
        .unwrap();
        let ids: Vec<Uuid> = view.iter().map(|v| v.queue_id).collect();
        assert_eq!(
            ids,
            vec![
                playing.queue_id,
                unplayed.queue_id,
                sung_early.queue_id,
                sung_late.queue_id
            ]
        );
        assert_eq!(view[2].display_status, DisplayStatus::Skipped);
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!("ALL".parse::<QueueFilter>().unwrap(), QueueFilter::All);
        assert!("pending".parse::<QueueFilter>().is_err());
    }
}
