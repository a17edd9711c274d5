//! Request intake, ClearMyQueue and DJ hold toggle

mod helpers;

use helpers::*;
use karaoke_common::db::HoldReason;
use karaoke_common::events::{Notification, QueueAction};
use karaoke_queue::queue::{DisplayStatus, NewRequest, QueueFilter};
use karaoke_queue::Error;
use uuid::Uuid;

fn new_request(requestor: &str, song_id: Uuid, singers: &[&str]) -> NewRequest {
    NewRequest {
        requestor: requestor.to_string(),
        song_id,
        singers: singers.iter().map(|s| s.to_string()).collect(),
    }
}

#[tokio::test]
async fn test_request_appends_to_tail() {
    let service = service().await;
    let event_id = live_event(&service, 3).await;
    present_singer(&service, event_id, "alice").await;
    present_singer(&service, event_id, "bob").await;

    let first = request(&service, event_id, "alice", &[]).await;
    let second = request(&service, event_id, "bob", &["bob", "alice"]).await;

    assert_eq!(first.position, 1);
    assert_eq!(second.position, 2);
    assert_eq!(second.singers.individuals(), ["bob".to_string(), "alice".to_string()]);
    assert!(!second.is_on_break);
}

#[tokio::test]
async fn test_request_limit_enforced() {
    let service = service().await;
    let event_id = live_event(&service, 2).await;
    present_singer(&service, event_id, "alice").await;

    let first = request(&service, event_id, "alice", &[]).await;
    request(&service, event_id, "alice", &[]).await;

    let song_id = song(&service, "One too many").await;
    let err = service
        .requests()
        .add_request(event_id, &new_request("alice", song_id, &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ValidationFailed(_)));

    // A finished song frees a slot
    service.playback().complete(event_id, first.queue_id).await.unwrap();
    service
        .requests()
        .add_request(event_id, &new_request("alice", song_id, &[]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_singer_list_validation() {
    let service = service().await;
    let event_id = live_event(&service, 5).await;
    let names = ["s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8"];
    for name in names {
        singer(&service, name).await;
    }
    let song_id = song(&service, "Bohemian Rhapsody").await;

    let err = service
        .requests()
        .add_request(event_id, &new_request("s1", song_id, &names))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ValidationFailed(_)));

    let err = service
        .requests()
        .add_request(event_id, &new_request("s1", song_id, &["AllSing", "s2"]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ValidationFailed(_)));

    let err = service
        .requests()
        .add_request(event_id, &new_request("s1", song_id, &["s1", "nobody"]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ValidationFailed(_)));

    let entry = service
        .requests()
        .add_request(event_id, &new_request("s1", song_id, &names[..7]))
        .await
        .unwrap();
    assert_eq!(entry.singers.individuals().len(), 7);
}

#[tokio::test]
async fn test_unknown_song_or_event_not_found() {
    let service = service().await;
    let event_id = live_event(&service, 3).await;
    singer(&service, "alice").await;

    let err = service
        .requests()
        .add_request(event_id, &new_request("alice", Uuid::new_v4(), &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let song_id = song(&service, "Valerie").await;
    let err = service
        .requests()
        .add_request(Uuid::new_v4(), &new_request("alice", song_id, &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_archived_event_rejects_requests() {
    let service = service().await;
    let event_id = live_event(&service, 3).await;
    singer(&service, "alice").await;
    let song_id = song(&service, "Valerie").await;
    service.lifecycle().end_event(event_id).await.unwrap();

    let err = service
        .requests()
        .add_request(event_id, &new_request("alice", song_id, &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidStateTransition(_)));
}

#[tokio::test]
async fn test_clear_my_queue_keeps_others() {
    let service = service().await;
    let event_id = live_event(&service, 3).await;
    present_singer(&service, event_id, "alice").await;
    present_singer(&service, event_id, "bob").await;

    let a1 = request(&service, event_id, "alice", &[]).await.queue_id;
    let b1 = request(&service, event_id, "bob", &[]).await.queue_id;
    let a2 = request(&service, event_id, "alice", &[]).await.queue_id;
    let b2 = request(&service, event_id, "bob", &[]).await.queue_id;

    let mut rx = service.notifier().subscribe(event_id);
    let removed = service.requests().clear_my_queue(event_id, "alice").await.unwrap();
    assert_eq!(removed, vec![a1, a2]);

    assert_eq!(unplayed_ids(&service, event_id).await, vec![b1, b2]);
    assert_eq!(unplayed_positions(&service, event_id).await, vec![1, 2]);

    let removals = drain(&mut rx)
        .into_iter()
        .filter(|n| matches!(n, Notification::QueueUpdated { action: QueueAction::Removed, .. }))
        .count();
    assert_eq!(removals, 2);
}

#[tokio::test]
async fn test_clear_my_queue_spares_playing_song() {
    let service = service().await;
    let event_id = live_event(&service, 3).await;
    present_singer(&service, event_id, "alice").await;

    let playing = request(&service, event_id, "alice", &[]).await.queue_id;
    let waiting = request(&service, event_id, "alice", &[]).await.queue_id;
    service.playback().play(event_id, playing).await.unwrap();

    let removed = service.requests().clear_my_queue(event_id, "alice").await.unwrap();
    assert_eq!(removed, vec![waiting]);
    assert!(entry(&service, event_id, playing).await.is_currently_playing);
}

#[tokio::test]
async fn test_toggle_break() {
    let service = service().await;
    let event_id = live_event(&service, 3).await;
    present_singer(&service, event_id, "alice").await;
    let song = request(&service, event_id, "alice", &[]).await;

    let held = service
        .requests()
        .toggle_break(event_id, song.queue_id, true)
        .await
        .unwrap();
    assert!(held.held_by_dj && held.is_on_break);

    // Repeating is a no-op
    let again = service
        .requests()
        .toggle_break(event_id, song.queue_id, true)
        .await
        .unwrap();
    assert_eq!(again.updated_at, held.updated_at);

    let released = service
        .requests()
        .toggle_break(event_id, song.queue_id, false)
        .await
        .unwrap();
    assert!(!released.held_by_dj && !released.is_on_break);

    service.playback().play(event_id, song.queue_id).await.unwrap();
    let err = service
        .requests()
        .toggle_break(event_id, song.queue_id, true)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidStateTransition(_)));
}

#[tokio::test]
async fn test_request_from_absent_singer_starts_held() {
    let service = service().await;
    let event_id = live_event(&service, 3).await;
    singer(&service, "dave").await;

    let mut rx = service.notifier().subscribe(event_id);
    let song = request(&service, event_id, "dave", &[]).await;
    assert!(song.is_on_break);
    assert!(!song.held_by_dj);
    assert_eq!(song.hold_reason, HoldReason::NotJoined);

    let stored = entry(&service, event_id, song.queue_id).await;
    assert_eq!(stored.hold_reason, HoldReason::NotJoined);

    let actions: Vec<QueueAction> = drain(&mut rx)
        .into_iter()
        .filter_map(|n| match n {
            Notification::QueueUpdated { action, .. } => Some(action),
            _ => None,
        })
        .collect();
    assert_eq!(actions, vec![QueueAction::Added, QueueAction::OnHold]);
}

#[tokio::test]
async fn test_lifting_dj_hold_keeps_attendance_hold() {
    let service = service().await;
    let event_id = live_event(&service, 3).await;
    present_singer(&service, event_id, "alice").await;
    let song = request(&service, event_id, "alice", &[]).await;
    service.attendance().check_out(event_id, "alice").await.unwrap();

    service
        .requests()
        .toggle_break(event_id, song.queue_id, true)
        .await
        .unwrap();
    let lifted = service
        .requests()
        .toggle_break(event_id, song.queue_id, false)
        .await
        .unwrap();
    assert!(!lifted.held_by_dj);
    assert!(lifted.is_on_break);
    assert_eq!(lifted.hold_reason, HoldReason::NotJoined);

    let unplayed = service
        .view()
        .get_queue(event_id, QueueFilter::Unplayed)
        .await
        .unwrap();
    assert_eq!(unplayed.len(), 1);
    assert_eq!(unplayed[0].display_status, DisplayStatus::Held);
    assert!(!unplayed[0].is_up_next);
}
