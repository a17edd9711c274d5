//! Playback transitions: Play, Skip, Complete
//!
//! At most one entry per event is playing. Every transition that sets the
//! flag first clears it everywhere else in the same transaction.

use super::Collaborators;
use crate::db;
use crate::utils::db_retry::retry_on_lock;
use karaoke_common::db::QueueEntry;
use karaoke_common::events::{Notification, QueueAction};
use karaoke_common::{time, Error, Result};
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

/// Whether a transition changed anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    /// Entry was already in the requested state
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finish {
    Skip,
    Complete,
}

/// Clear-then-set of the playing flag, followed by position compaction
///
/// Interrupted entries go back to the front of the reorderable subset.
pub(crate) async fn start_playing(conn: &mut SqliteConnection, entry: &QueueEntry) -> Result<()> {
    for playing in db::queue::playing_entries(conn, entry.event_id).await? {
        if playing.queue_id != entry.queue_id {
            debug!(
                event_id = %entry.event_id,
                queue_id = %playing.queue_id,
                "Interrupting playing entry"
            );
            db::queue::clear_playing(conn, &playing).await?;
        }
    }

    db::queue::mark_playing(conn, entry).await?;
    db::queue::compact_positions(conn, entry.event_id).await?;
    Ok(())
}

pub struct PlaybackTransitions<'a> {
    deps: Collaborators<'a>,
}

impl<'a> PlaybackTransitions<'a> {
    pub(crate) fn new(deps: Collaborators<'a>) -> Self {
        Self { deps }
    }

    /// Make an entry the one playing entry of its event
    ///
    /// Playing the entry that already plays is a no-op.
    pub async fn play(&self, event_id: Uuid, queue_id: Uuid) -> Result<TransitionOutcome> {
        retry_on_lock("play", self.deps.settings.max_lock_wait_ms, move || {
            self.try_play(event_id, queue_id)
        })
        .await
    }

    async fn try_play(&self, event_id: Uuid, queue_id: Uuid) -> Result<TransitionOutcome> {
        let _guard = self.deps.locks.acquire(event_id).await?;
        let mut tx = self.deps.db.begin().await?;

        db::events::require_event(&mut *tx, event_id).await?;
        let entry = db::queue::require_entry(&mut *tx, event_id, queue_id).await?;

        if entry.is_currently_playing {
            return Ok(TransitionOutcome::Unchanged);
        }
        if !entry.is_active {
            return Err(Error::InvalidStateTransition(format!(
                "Queue entry {} is archived",
                queue_id
            )));
        }
        if entry.sung_at.is_some() {
            return Err(Error::InvalidStateTransition(format!(
                "Queue entry {} was already sung",
                queue_id
            )));
        }

        let song = db::songs::require_song(&mut *tx, entry.song_id).await?;
        start_playing(&mut *tx, &entry).await?;
        tx.commit().await?;

        info!(event_id = %event_id, queue_id = %queue_id, title = %song.title, "Now playing");
        self.deps
            .notifier
            .publish(Notification::playing(event_id, queue_id, song.media_ref));
        Ok(TransitionOutcome::Applied)
    }

    /// Skip an entry: counts as finished but not as completed
    pub async fn skip(&self, event_id: Uuid, queue_id: Uuid) -> Result<TransitionOutcome> {
        retry_on_lock("skip", self.deps.settings.max_lock_wait_ms, move || {
            self.try_finish(event_id, queue_id, Finish::Skip)
        })
        .await
    }

    /// Complete an entry and bump the event's completed count
    pub async fn complete(&self, event_id: Uuid, queue_id: Uuid) -> Result<TransitionOutcome> {
        retry_on_lock("complete", self.deps.settings.max_lock_wait_ms, move || {
            self.try_finish(event_id, queue_id, Finish::Complete)
        })
        .await
    }

    async fn try_finish(
        &self,
        event_id: Uuid,
        queue_id: Uuid,
        finish: Finish,
    ) -> Result<TransitionOutcome> {
        let _guard = self.deps.locks.acquire(event_id).await?;
        let mut tx = self.deps.db.begin().await?;

        let event = db::events::require_event(&mut *tx, event_id).await?;
        let entry = db::queue::require_entry(&mut *tx, event_id, queue_id).await?;

        if entry.sung_at.is_some() {
            debug!(event_id = %event_id, queue_id = %queue_id, ?finish, "Entry already finished");
            return Ok(TransitionOutcome::Unchanged);
        }
        if !entry.is_active {
            return Err(Error::InvalidStateTransition(format!(
                "Queue entry {} is archived",
                queue_id
            )));
        }

        let skipped = finish == Finish::Skip;
        db::queue::mark_finished(&mut *tx, &entry, skipped, time::now()).await?;
        if !skipped {
            db::events::increment_songs_completed(
                &mut *tx,
                event_id,
                time::next_stamp(event.updated_at),
            )
            .await?;
        }
        db::queue::compact_positions(&mut *tx, event_id).await?;
        tx.commit().await?;

        let action = match finish {
            Finish::Skip => QueueAction::Skipped,
            Finish::Complete => QueueAction::Sung,
        };
        info!(event_id = %event_id, queue_id = %queue_id, %action, "Queue entry finished");
        self.deps
            .notifier
            .publish(Notification::queue_entry(event_id, queue_id, action));
        Ok(TransitionOutcome::Applied)
    }
}
