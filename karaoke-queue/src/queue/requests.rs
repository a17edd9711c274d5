//! Song requests: add, clear, DJ hold toggle

use super::attendance::sync_entry_hold;
use super::hold::resolve_hold_reason;
use super::Collaborators;
use crate::db;
use crate::utils::db_retry::retry_on_lock;
use karaoke_common::db::{HoldReason, QueueEntry, SingerList};
use karaoke_common::events::{Notification, QueueAction};
use karaoke_common::{time, uuid_utils, Error, Result};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

/// Incoming song request
#[derive(Debug, Clone, Deserialize)]
pub struct NewRequest {
    pub requestor: String,
    pub song_id: Uuid,
    /// Singer ids in assignment order, or a single group token;
    /// defaults to the requestor alone
    #[serde(default)]
    pub singers: Vec<String>,
}

pub struct RequestIntake<'a> {
    deps: Collaborators<'a>,
}

impl<'a> RequestIntake<'a> {
    pub(crate) fn new(deps: Collaborators<'a>) -> Self {
        Self { deps }
    }

    /// Validate a request and append it to the end of the queue
    pub async fn add_request(&self, event_id: Uuid, request: &NewRequest) -> Result<QueueEntry> {
        retry_on_lock("add request", self.deps.settings.max_lock_wait_ms, move || {
            self.try_add_request(event_id, request)
        })
        .await
    }

    async fn try_add_request(&self, event_id: Uuid, request: &NewRequest) -> Result<QueueEntry> {
        let singers = if request.singers.is_empty() {
            SingerList::solo(&request.requestor)?
        } else {
            SingerList::parse(&request.singers)?
        };

        let _guard = self.deps.locks.acquire(event_id).await?;
        let mut tx = self.deps.db.begin().await?;

        let event = db::events::require_open_event(&mut *tx, event_id).await?;
        db::singers::require_singer(&mut *tx, &request.requestor).await?;
        db::songs::require_song(&mut *tx, request.song_id).await?;

        for singer_id in singers.individuals() {
            if db::singers::get_singer(&mut *tx, singer_id).await?.is_none() {
                return Err(Error::ValidationFailed(format!("Unknown singer {}", singer_id)));
            }
        }

        let pending =
            db::queue::count_unplayed_for_requestor(&mut *tx, event_id, &request.requestor).await?;
        if pending >= event.request_limit {
            return Err(Error::ValidationFailed(format!(
                "{} already has {} unplayed requests (limit {})",
                request.requestor, pending, event.request_limit
            )));
        }

        db::queue::compact_positions(&mut *tx, event_id).await?;
        let tail = db::queue::reorderable_entries(&mut *tx, event_id).await?.len() as i64;

        let attendance = db::attendance::records_for_event(&mut *tx, event_id).await?;
        let hold_reason = resolve_hold_reason(&singers, &attendance);

        let now = time::now();
        let entry = QueueEntry {
            queue_id: uuid_utils::generate(),
            event_id,
            song_id: request.song_id,
            requestor: request.requestor.clone(),
            singers,
            position: tail + 1,
            is_active: true,
            was_skipped: false,
            is_currently_playing: false,
            is_on_break: hold_reason.is_blocking(),
            held_by_dj: false,
            hold_reason,
            sung_at: None,
            created_at: now,
            updated_at: now,
        };
        db::queue::insert_entry(&mut *tx, &entry).await?;
        tx.commit().await?;

        info!(
            event_id = %event_id,
            queue_id = %entry.queue_id,
            requestor = %entry.requestor,
            position = entry.position,
            hold_reason = %entry.hold_reason,
            "Request added"
        );
        self.deps.notifier.publish(Notification::queue_entry(
            event_id,
            entry.queue_id,
            QueueAction::Added,
        ));
        if entry.is_on_break {
            self.deps
                .notifier
                .publish(Notification::held(event_id, entry.queue_id, entry.hold_reason));
        }
        Ok(entry)
    }

    /// Delete every unplayed request of one requestor
    ///
    /// Returns the removed queue ids.
    pub async fn clear_my_queue(&self, event_id: Uuid, requestor: &str) -> Result<Vec<Uuid>> {
        retry_on_lock("clear my queue", self.deps.settings.max_lock_wait_ms, move || {
            self.try_clear_my_queue(event_id, requestor)
        })
        .await
    }

    async fn try_clear_my_queue(&self, event_id: Uuid, requestor: &str) -> Result<Vec<Uuid>> {
        let _guard = self.deps.locks.acquire(event_id).await?;
        let mut tx = self.deps.db.begin().await?;

        db::events::require_event(&mut *tx, event_id).await?;
        let removed: Vec<Uuid> = db::queue::reorderable_entries(&mut *tx, event_id)
            .await?
            .into_iter()
            .filter(|e| e.requestor == requestor)
            .map(|e| e.queue_id)
            .collect();

        for queue_id in &removed {
            db::queue::delete_entry(&mut *tx, *queue_id).await?;
        }
        db::queue::compact_positions(&mut *tx, event_id).await?;
        tx.commit().await?;

        info!(event_id = %event_id, requestor, removed = removed.len(), "Cleared requestor's queue");
        self.deps.notifier.publish_all(
            removed
                .iter()
                .map(|id| Notification::queue_entry(event_id, *id, QueueAction::Removed)),
        );
        Ok(removed)
    }

    /// Place or lift a manual DJ hold
    pub async fn toggle_break(&self, event_id: Uuid, queue_id: Uuid, on_break: bool) -> Result<QueueEntry> {
        retry_on_lock("toggle break", self.deps.settings.max_lock_wait_ms, move || {
            self.try_toggle_break(event_id, queue_id, on_break)
        })
        .await
    }

    async fn try_toggle_break(&self, event_id: Uuid, queue_id: Uuid, on_break: bool) -> Result<QueueEntry> {
        let _guard = self.deps.locks.acquire(event_id).await?;
        let mut tx = self.deps.db.begin().await?;

        db::events::require_event(&mut *tx, event_id).await?;
        let entry = db::queue::require_entry(&mut *tx, event_id, queue_id).await?;
        if !entry.is_reorderable() {
            return Err(Error::InvalidStateTransition(format!(
                "Queue entry {} is playing, finished or archived",
                queue_id
            )));
        }

        let unchanged = if on_break {
            entry.held_by_dj
        } else {
            !entry.is_on_break && !entry.held_by_dj
        };
        if unchanged {
            return Ok(entry);
        }

        let notification = if on_break {
            db::queue::set_hold(&mut *tx, &entry, true, true, HoldReason::None).await?;
            Some(Notification::queue_entry(event_id, queue_id, QueueAction::OnHold))
        } else {
            // Without the manual hold, attendance decides again
            let attendance = db::attendance::records_for_event(&mut *tx, event_id).await?;
            let released = QueueEntry {
                held_by_dj: false,
                ..entry.clone()
            };
            sync_entry_hold(&mut *tx, &released, &attendance).await?
        };
        // An attendance hold that still applies stays in place
        let Some(notification) = notification else {
            return Ok(entry);
        };
        let updated = db::queue::require_entry(&mut *tx, event_id, queue_id).await?;
        tx.commit().await?;

        info!(
            event_id = %event_id,
            queue_id = %queue_id,
            held_by_dj = updated.held_by_dj,
            hold_reason = %updated.hold_reason,
            "DJ hold toggled"
        );
        self.deps.notifier.publish(notification);
        Ok(updated)
    }
}
