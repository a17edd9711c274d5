//! Autoplay: pick the next playable entry
//!
//! Entries are scanned in position order. Blocked entries are marked held
//! and passed over without losing their position; the first available entry
//! starts playing. Entries held manually by the DJ are skipped untouched.
//!
//! Autoplay advances the show: a song still playing when another is
//! selected is finished as skipped. An explicit Play instead returns the
//! interrupted song to the front of the queue.

use super::hold::{hold_differs, resolve_hold_reason};
use super::playback::start_playing;
use super::Collaborators;
use crate::db;
use crate::utils::db_retry::retry_on_lock;
use karaoke_common::events::{Notification, QueueAction};
use karaoke_common::{time, Result};
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

/// Entry chosen by an autoplay pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NowPlaying {
    pub queue_id: Uuid,
    pub song_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
}

/// Result of an autoplay pass; finding nothing is not an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AutoplayOutcome {
    Selected(NowPlaying),
    NoEligibleSongs,
}

/// Scan and select inside the caller's transaction
///
/// Returns the outcome and the notifications to publish once the caller
/// has committed. `OnHold` is announced only when an entry's stored hold
/// changes, so repeated passes over the same blocked entry stay quiet.
pub(crate) async fn select_next(
    conn: &mut SqliteConnection,
    event_id: Uuid,
) -> Result<(AutoplayOutcome, Vec<Notification>)> {
    let candidates = db::queue::autoplay_candidates(conn, event_id).await?;
    let attendance = db::attendance::records_for_event(conn, event_id).await?;
    let mut notifications = Vec::new();

    for entry in candidates {
        if entry.held_by_dj {
            continue;
        }

        let reason = resolve_hold_reason(&entry.singers, &attendance);
        if reason.is_blocking() {
            // Same hold as last pass: nothing to write or announce
            if hold_differs(&entry, reason) {
                db::queue::set_hold(conn, &entry, true, false, reason).await?;
                notifications.push(Notification::held(event_id, entry.queue_id, reason));
            }
            debug!(event_id = %event_id, queue_id = %entry.queue_id, %reason, "Passing over held entry");
            continue;
        }

        let song = db::songs::require_song(conn, entry.song_id).await?;
        for playing in db::queue::playing_entries(conn, event_id).await? {
            db::queue::mark_finished(conn, &playing, true, time::now()).await?;
            notifications.push(Notification::queue_entry(
                event_id,
                playing.queue_id,
                QueueAction::Skipped,
            ));
        }
        start_playing(conn, &entry).await?;
        notifications.push(Notification::playing(
            event_id,
            entry.queue_id,
            song.media_ref.clone(),
        ));

        let selected = NowPlaying {
            queue_id: entry.queue_id,
            song_id: entry.song_id,
            title: song.title,
            media_ref: song.media_ref,
        };
        return Ok((AutoplayOutcome::Selected(selected), notifications));
    }

    Ok((AutoplayOutcome::NoEligibleSongs, notifications))
}

pub struct AutoplaySelector<'a> {
    deps: Collaborators<'a>,
}

impl<'a> AutoplaySelector<'a> {
    pub(crate) fn new(deps: Collaborators<'a>) -> Self {
        Self { deps }
    }

    /// Select and start the next eligible entry of an event
    pub async fn next(&self, event_id: Uuid) -> Result<AutoplayOutcome> {
        retry_on_lock("autoplay", self.deps.settings.max_lock_wait_ms, move || {
            self.try_next(event_id)
        })
        .await
    }

    async fn try_next(&self, event_id: Uuid) -> Result<AutoplayOutcome> {
        let _guard = self.deps.locks.acquire(event_id).await?;
        let mut tx = self.deps.db.begin().await?;

        db::events::require_open_event(&mut *tx, event_id).await?;
        let (outcome, notifications) = select_next(&mut *tx, event_id).await?;
        tx.commit().await?;

        match &outcome {
            AutoplayOutcome::Selected(now) => info!(
                event_id = %event_id,
                queue_id = %now.queue_id,
                title = %now.title,
                "Autoplay selected entry"
            ),
            AutoplayOutcome::NoEligibleSongs => info!(
                event_id = %event_id,
                held = notifications.len(),
                "Autoplay found no eligible songs"
            ),
        }

        self.deps.notifier.publish_all(notifications);
        Ok(outcome)
    }
}
