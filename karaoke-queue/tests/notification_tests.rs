//! Event-scoped notification delivery

mod helpers;

use helpers::*;
use karaoke_common::db::EventStatus;
use karaoke_common::events::{Notification, QueueAction};
use karaoke_queue::Error;
use uuid::Uuid;

#[tokio::test]
async fn test_subscribers_only_see_their_event() {
    let service = service().await;
    let event_a = live_event(&service, 3).await;
    let event_b = live_event(&service, 3).await;
    present_singer(&service, event_a, "alice").await;
    service.attendance().check_in(event_b, "alice").await.unwrap();

    let mut rx_a = service.notifier().join(service.db(), event_a).await.unwrap();
    let mut rx_b = service.notifier().join(service.db(), event_b).await.unwrap();

    let entry_a = request(&service, event_a, "alice", &[]).await;
    request(&service, event_b, "alice", &[]).await;
    request(&service, event_b, "alice", &[]).await;
    service.playback().play(event_a, entry_a.queue_id).await.unwrap();

    let seen_a = drain(&mut rx_a);
    let seen_b = drain(&mut rx_b);
    assert_eq!(seen_a.len(), 2);
    assert_eq!(seen_b.len(), 2);
    assert!(seen_a.iter().all(|n| n.event_id() == event_a));
    assert!(seen_b.iter().all(|n| n.event_id() == event_b));

    match &seen_a[1] {
        Notification::QueueUpdated {
            action: QueueAction::Playing,
            queue_id,
            media_ref,
            ..
        } => {
            assert_eq!(*queue_id, Some(entry_a.queue_id));
            assert!(media_ref.is_some());
        }
        other => panic!("expected Playing, got {:?}", other),
    }
}

#[tokio::test]
async fn test_join_unknown_event_fails() {
    let service = service().await;
    let err = service
        .notifier()
        .join(service.db(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_failed_operation_publishes_nothing() {
    let service = service().await;
    let event_id = live_event(&service, 3).await;
    singer(&service, "alice").await;
    let mut rx = service.notifier().subscribe(event_id);

    assert!(service.attendance().end_break(event_id, "alice").await.is_err());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_ending_event_closes_channel() {
    let service = service().await;
    let event_id = live_event(&service, 3).await;
    let mut rx = service.notifier().join(service.db(), event_id).await.unwrap();

    service.lifecycle().end_event(event_id).await.unwrap();

    let last = rx.recv().await.unwrap();
    assert!(matches!(
        last,
        Notification::EventStatusChanged {
            status: EventStatus::Archived,
            ..
        }
    ));
    assert!(rx.recv().await.is_err());

    let err = service
        .notifier()
        .join(service.db(), event_id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidStateTransition(_)));
}
