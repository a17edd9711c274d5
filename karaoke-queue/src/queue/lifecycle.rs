//! Event lifecycle: Upcoming -> Live -> Archived

use super::Collaborators;
use crate::db;
use crate::utils::db_retry::retry_on_lock;
use karaoke_common::db::{Event, EventStatus};
use karaoke_common::events::Notification;
use karaoke_common::{time, uuid_utils, Error, Result};
use tracing::info;
use uuid::Uuid;

pub struct EventLifecycle<'a> {
    deps: Collaborators<'a>,
}

impl<'a> EventLifecycle<'a> {
    pub(crate) fn new(deps: Collaborators<'a>) -> Self {
        Self { deps }
    }

    /// Create an `Upcoming` event
    pub async fn create_event(&self, name: &str, request_limit: i64) -> Result<Event> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::ValidationFailed("Event name must not be blank".to_string()));
        }
        if request_limit < 1 {
            return Err(Error::ValidationFailed(format!(
                "Request limit must be at least 1 (got {})",
                request_limit
            )));
        }

        let now = time::now();
        let event = Event {
            event_id: uuid_utils::generate(),
            name: name.to_string(),
            status: EventStatus::Upcoming,
            request_limit,
            songs_completed: 0,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.deps.db.acquire().await?;
        db::events::insert_event(&mut *conn, &event).await?;

        info!(event_id = %event.event_id, name = %event.name, request_limit, "Event created");
        Ok(event)
    }

    pub async fn get_event(&self, event_id: Uuid) -> Result<Event> {
        let mut conn = self.deps.db.acquire().await?;
        db::events::require_event(&mut *conn, event_id).await
    }

    /// Upcoming -> Live
    pub async fn start_event(&self, event_id: Uuid) -> Result<Event> {
        retry_on_lock("start event", self.deps.settings.max_lock_wait_ms, move || {
            self.try_transition(event_id, EventStatus::Live)
        })
        .await
    }

    /// Upcoming or Live -> Archived; every entry is deactivated
    ///
    /// Subscribers receive the `EventStatusChanged` notification, then the
    /// channel closes and the event's lock slot is released.
    pub async fn end_event(&self, event_id: Uuid) -> Result<Event> {
        let event = retry_on_lock("end event", self.deps.settings.max_lock_wait_ms, move || {
            self.try_transition(event_id, EventStatus::Archived)
        })
        .await?;
        self.deps.notifier.close(event_id);
        self.deps.locks.forget(event_id);
        Ok(event)
    }

    async fn try_transition(&self, event_id: Uuid, target: EventStatus) -> Result<Event> {
        let _guard = self.deps.locks.acquire(event_id).await?;
        let mut tx = self.deps.db.begin().await?;

        let event = db::events::require_event(&mut *tx, event_id).await?;
        let allowed = matches!(
            (event.status, target),
            (EventStatus::Upcoming, EventStatus::Live)
                | (EventStatus::Upcoming, EventStatus::Archived)
                | (EventStatus::Live, EventStatus::Archived)
        );
        if !allowed {
            return Err(Error::InvalidStateTransition(format!(
                "Event {} cannot move from {} to {}",
                event_id, event.status, target
            )));
        }

        let stamp = time::next_stamp(event.updated_at);
        db::events::set_status(&mut *tx, event_id, target, stamp).await?;
        let archived = if target == EventStatus::Archived {
            db::queue::archive_event_entries(&mut *tx, event_id).await?
        } else {
            0
        };
        tx.commit().await?;

        info!(event_id = %event_id, from = %event.status, to = %target, archived, "Event status changed");
        self.deps.notifier.publish(Notification::EventStatusChanged {
            event_id,
            status: target,
            timestamp: time::now(),
        });

        Ok(Event {
            status: target,
            updated_at: stamp,
            ..event
        })
    }
}
