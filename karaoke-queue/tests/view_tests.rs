//! GetQueue projection over a live event

mod helpers;

use helpers::*;
use karaoke_common::db::HoldReason;
use karaoke_queue::queue::{DisplayStatus, QueueFilter};
use karaoke_queue::Error;

#[tokio::test]
async fn test_up_next_skips_held_entries() {
    let service = service().await;
    let event_id = live_event(&service, 3).await;
    present_singer(&service, event_id, "alice").await;
    present_singer(&service, event_id, "bob").await;
    present_singer(&service, event_id, "carol").await;

    let a = request(&service, event_id, "alice", &[]).await.queue_id;
    let b = request(&service, event_id, "bob", &[]).await.queue_id;
    let c = request(&service, event_id, "carol", &[]).await.queue_id;

    service.playback().play(event_id, c).await.unwrap();
    service.attendance().start_break(event_id, "alice").await.unwrap();

    let unplayed = service
        .view()
        .get_queue(event_id, QueueFilter::Unplayed)
        .await
        .unwrap();
    assert_eq!(unplayed.len(), 2);
    assert_eq!(unplayed[0].queue_id, a);
    assert_eq!(unplayed[0].display_status, DisplayStatus::Held);
    assert!(!unplayed[0].is_up_next);
    assert_eq!(unplayed[1].queue_id, b);
    assert!(unplayed[1].is_up_next);

    let playing = service
        .view()
        .get_queue(event_id, QueueFilter::Playing)
        .await
        .unwrap();
    assert_eq!(playing.len(), 1);
    assert_eq!(playing[0].queue_id, c);
    assert_eq!(playing[0].display_status, DisplayStatus::Playing);
    assert!(playing[0].media_ref.is_some());
}

#[tokio::test]
async fn test_all_filter_groups_by_state() {
    let service = service().await;
    let event_id = live_event(&service, 3).await;
    present_singer(&service, event_id, "alice").await;

    let sung = request(&service, event_id, "alice", &[]).await.queue_id;
    let skipped = request(&service, event_id, "alice", &[]).await.queue_id;
    let waiting = request(&service, event_id, "alice", &[]).await.queue_id;

    service.playback().complete(event_id, sung).await.unwrap();
    service.playback().skip(event_id, skipped).await.unwrap();

    let all = service.view().get_queue(event_id, QueueFilter::All).await.unwrap();
    let ids: Vec<_> = all.iter().map(|v| v.queue_id).collect();
    assert_eq!(ids, vec![waiting, sung, skipped]);
    assert_eq!(all[1].display_status, DisplayStatus::Sung);
    assert_eq!(all[2].display_status, DisplayStatus::Skipped);

    let completed = service
        .view()
        .get_queue(event_id, QueueFilter::Completed)
        .await
        .unwrap();
    assert_eq!(completed.len(), 2);
}

#[tokio::test]
async fn test_absent_singer_is_never_up_next() {
    let service = service().await;
    let event_id = live_event(&service, 3).await;
    singer(&service, "dave").await;
    present_singer(&service, event_id, "alice").await;

    let d = request(&service, event_id, "dave", &[]).await.queue_id;
    let a = request(&service, event_id, "alice", &[]).await.queue_id;

    let unplayed = service
        .view()
        .get_queue(event_id, QueueFilter::Unplayed)
        .await
        .unwrap();
    assert_eq!(unplayed.len(), 2);
    assert_eq!(unplayed[0].queue_id, d);
    assert_eq!(unplayed[0].display_status, DisplayStatus::Held);
    assert_eq!(unplayed[0].hold_reason, HoldReason::NotJoined);
    assert!(!unplayed[0].is_up_next);
    assert_eq!(unplayed[1].queue_id, a);
    assert_eq!(unplayed[1].display_status, DisplayStatus::Unplayed);
    assert!(unplayed[1].is_up_next);
}

#[tokio::test]
async fn test_unknown_event_not_found() {
    let service = service().await;
    let err = service
        .view()
        .get_queue(uuid::Uuid::new_v4(), QueueFilter::All)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}
