//! Per-event broadcast channels

use crate::config::QueueSettings;
use crate::db;
use karaoke_common::db::EventStatus;
use karaoke_common::events::Notification;
use karaoke_common::{Error, Result};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Notifier manages one broadcast channel per event
///
/// Channels are created on first subscription. Publishing to an event
/// nobody listens to is a silent no-op.
#[derive(Clone)]
pub struct Notifier {
    channels: Arc<RwLock<HashMap<Uuid, broadcast::Sender<Notification>>>>,
    capacity: usize,
    join_attempts: u32,
    join_backoff: Duration,
}

impl Notifier {
    /// Create a notifier
    ///
    /// # Arguments
    ///
    /// * `capacity` - Notifications buffered per event before slow
    ///   subscribers start lagging
    pub fn new(capacity: usize) -> Self {
        info!("Notifier initialized with per-event capacity {}", capacity);
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
            join_attempts: 3,
            join_backoff: Duration::from_millis(100),
        }
    }

    pub fn from_settings(settings: &QueueSettings) -> Self {
        let mut notifier = Self::new(settings.broadcast_capacity);
        notifier.join_attempts = settings.subscribe_attempts.max(1);
        notifier.join_backoff = settings.subscribe_backoff();
        notifier
    }

    /// Send a notification to every subscriber of its event
    ///
    /// Returns the number of subscribers reached.
    pub fn publish(&self, notification: Notification) -> usize {
        let event_id = notification.event_id();
        let channels = self.channels.read().unwrap_or_else(|e| e.into_inner());
        match channels.get(&event_id) {
            Some(tx) => match tx.send(notification) {
                Ok(count) => {
                    debug!(event_id = %event_id, subscribers = count, "Published notification");
                    count
                }
                Err(_) => 0,
            },
            None => 0,
        }
    }

    /// Publish in order
    pub fn publish_all(&self, notifications: impl IntoIterator<Item = Notification>) {
        for notification in notifications {
            self.publish(notification);
        }
    }

    /// Subscribe to an event channel, creating it if needed
    ///
    /// Does not check that the event exists; see [`Notifier::join`].
    pub fn subscribe(&self, event_id: Uuid) -> broadcast::Receiver<Notification> {
        let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
        channels
            .entry(event_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Join an event channel after confirming the event exists
    ///
    /// The event lookup is retried with doubling backoff when the database
    /// fails; an unknown event is `NotFound` straight away and an archived
    /// one is `InvalidStateTransition`.
    pub async fn join(
        &self,
        pool: &SqlitePool,
        event_id: Uuid,
    ) -> Result<broadcast::Receiver<Notification>> {
        let mut backoff = self.join_backoff;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let lookup = match pool.acquire().await {
                Ok(mut conn) => db::events::get_event(&mut *conn, event_id).await,
                Err(e) => Err(Error::Database(e)),
            };

            match lookup {
                Ok(Some(event)) if event.status == EventStatus::Archived => {
                    return Err(Error::InvalidStateTransition(format!(
                        "Event {} is archived",
                        event_id
                    )));
                }
                Ok(Some(_)) => return Ok(self.subscribe(event_id)),
                Ok(None) => return Err(Error::NotFound(format!("Event {}", event_id))),
                Err(e) if attempt < self.join_attempts => {
                    warn!(
                        event_id = %event_id,
                        attempt,
                        backoff_ms = backoff.as_millis(),
                        "Event lookup failed while joining channel: {}",
                        e
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Current number of subscribers of one event
    pub fn subscriber_count(&self, event_id: Uuid) -> usize {
        let channels = self.channels.read().unwrap_or_else(|e| e.into_inner());
        channels
            .get(&event_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Drop an event's channel; open subscriptions see the stream end
    pub fn close(&self, event_id: Uuid) {
        let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
        if channels.remove(&event_id).is_some() {
            info!(event_id = %event_id, "Closed notification channel");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use karaoke_common::events::QueueAction;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let notifier = Notifier::new(8);
        let n = Notification::reordered(Uuid::new_v4());
        assert_eq!(notifier.publish(n), 0);
    }

    #[test]
    fn test_subscribers_only_see_their_event() {
        let notifier = Notifier::new(8);
        let event_a = Uuid::new_v4();
        let event_b = Uuid::new_v4();

        let mut rx_a = notifier.subscribe(event_a);
        let mut rx_b = notifier.subscribe(event_b);

        notifier.publish(Notification::queue_entry(
            event_a,
            Uuid::new_v4(),
            QueueAction::Added,
        ));

        let received = rx_a.try_recv().unwrap();
        assert_eq!(received.event_id(), event_a);
        assert!(matches!(rx_b.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_close_ends_subscriptions() {
        let notifier = Notifier::new(8);
        let event_id = Uuid::new_v4();
        let mut rx = notifier.subscribe(event_id);
        assert_eq!(notifier.subscriber_count(event_id), 1);

        notifier.close(event_id);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Closed)));
        assert_eq!(notifier.subscriber_count(event_id), 0);
    }
}
