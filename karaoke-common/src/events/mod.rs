//! Notification types for the karaoke real-time channel
//!
//! Every state transition the queue service commits is described by one
//! [`Notification`]. Notifications are scoped to a single karaoke event and
//! serialized as JSON for SSE transmission.

mod queue_types;

pub use queue_types::QueueAction;

use crate::db::{EventStatus, HoldReason};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification published to every subscriber of an event channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Notification {
    /// A queue entry changed state, or the queue order changed
    ///
    /// Triggers:
    /// - DJ console: refresh queue table
    /// - Big screen: show now playing / up next
    /// - Singer app: update "my requests"
    QueueUpdated {
        event_id: Uuid,
        /// None for whole-queue changes (`Reordered`)
        queue_id: Option<Uuid>,
        action: QueueAction,
        /// Media reference of the song, sent with `Playing`
        #[serde(skip_serializing_if = "Option::is_none")]
        media_ref: Option<String>,
        /// Reason attached with `OnHold`
        #[serde(skip_serializing_if = "Option::is_none")]
        hold_reason: Option<HoldReason>,
        timestamp: DateTime<Utc>,
    },

    /// A singer's attendance flags changed
    SingerStatusUpdated {
        singer_id: String,
        event_id: Uuid,
        display_name: String,
        is_logged_in: bool,
        is_joined: bool,
        is_on_break: bool,
        timestamp: DateTime<Utc>,
    },

    /// Event lifecycle changed (started, archived)
    EventStatusChanged {
        event_id: Uuid,
        status: EventStatus,
        timestamp: DateTime<Utc>,
    },
}

impl Notification {
    /// Entry-level queue notification
    pub fn queue_entry(event_id: Uuid, queue_id: Uuid, action: QueueAction) -> Self {
        Notification::QueueUpdated {
            event_id,
            queue_id: Some(queue_id),
            action,
            media_ref: None,
            hold_reason: None,
            timestamp: Utc::now(),
        }
    }

    /// `Playing` notification carrying the media reference
    pub fn playing(event_id: Uuid, queue_id: Uuid, media_ref: Option<String>) -> Self {
        Notification::QueueUpdated {
            event_id,
            queue_id: Some(queue_id),
            action: QueueAction::Playing,
            media_ref,
            hold_reason: None,
            timestamp: Utc::now(),
        }
    }

    /// `OnHold` notification carrying the hold reason
    pub fn held(event_id: Uuid, queue_id: Uuid, reason: HoldReason) -> Self {
        Notification::QueueUpdated {
            event_id,
            queue_id: Some(queue_id),
            action: QueueAction::OnHold,
            media_ref: None,
            hold_reason: Some(reason),
            timestamp: Utc::now(),
        }
    }

    /// Single whole-queue notification for a committed reorder
    pub fn reordered(event_id: Uuid) -> Self {
        Notification::QueueUpdated {
            event_id,
            queue_id: None,
            action: QueueAction::Reordered,
            media_ref: None,
            hold_reason: None,
            timestamp: Utc::now(),
        }
    }

    /// Event channel this notification belongs to
    pub fn event_id(&self) -> Uuid {
        match self {
            Notification::QueueUpdated { event_id, .. }
            | Notification::SingerStatusUpdated { event_id, .. }
            | Notification::EventStatusChanged { event_id, .. } => *event_id,
        }
    }

    /// SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            Notification::QueueUpdated { .. } => "QueueUpdated",
            Notification::SingerStatusUpdated { .. } => "SingerStatusUpdated",
            Notification::EventStatusChanged { .. } => "EventStatusChanged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_updated_serialization_omits_empty_fields() {
        let event_id = Uuid::new_v4();
        let queue_id = Uuid::new_v4();
        let json = serde_json::to_value(Notification::queue_entry(
            event_id,
            queue_id,
            QueueAction::Sung,
        ))
        .unwrap();

        assert_eq!(json["type"], "QueueUpdated");
        assert_eq!(json["action"], "Sung");
        assert_eq!(json["queue_id"], queue_id.to_string());
        assert!(json.get("media_ref").is_none());
        assert!(json.get("hold_reason").is_none());
    }

    #[test]
    fn test_held_carries_reason() {
        let n = Notification::held(Uuid::new_v4(), Uuid::new_v4(), HoldReason::NotJoined);
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["action"], "OnHold");
        assert_eq!(json["hold_reason"], "NotJoined");
        assert_eq!(n.event_type(), "QueueUpdated");
    }

    #[test]
    fn test_reordered_has_no_queue_id() {
        let event_id = Uuid::new_v4();
        let n = Notification::reordered(event_id);
        assert_eq!(n.event_id(), event_id);
        let json = serde_json::to_value(&n).unwrap();
        assert!(json["queue_id"].is_null());
    }
}
