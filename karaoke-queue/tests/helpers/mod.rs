//! Shared fixtures for karaoke-queue integration tests
//!
//! Every test gets its own in-memory database and service instance.

#![allow(dead_code)]

use karaoke_common::db::{init_memory_database, QueueEntry, Singer, Song};
use karaoke_common::events::Notification;
use karaoke_queue::config::QueueSettings;
use karaoke_queue::db;
use karaoke_queue::queue::NewRequest;
use karaoke_queue::QueueService;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Fresh service over an empty in-memory database
pub async fn service() -> QueueService {
    let pool = init_memory_database().await.unwrap();
    QueueService::with_settings(pool, QueueSettings::default())
}

/// Create and start an event
pub async fn live_event(service: &QueueService, request_limit: i64) -> Uuid {
    let event = service
        .lifecycle()
        .create_event("Friday Night Karaoke", request_limit)
        .await
        .unwrap();
    service.lifecycle().start_event(event.event_id).await.unwrap();
    event.event_id
}

pub async fn singer(service: &QueueService, singer_id: &str) {
    let mut display_name = singer_id.to_string();
    display_name[..1].make_ascii_uppercase();
    service
        .directory()
        .upsert_singer(Singer {
            singer_id: singer_id.to_string(),
            display_name,
        })
        .await
        .unwrap();
}

pub async fn song(service: &QueueService, title: &str) -> Uuid {
    let song_id = Uuid::new_v4();
    service
        .directory()
        .upsert_song(Song {
            song_id,
            title: title.to_string(),
            artist: "Various".to_string(),
            media_ref: Some(format!("media://{}", song_id)),
        })
        .await
        .unwrap();
    song_id
}

/// Register a singer and check them in to the event
pub async fn present_singer(service: &QueueService, event_id: Uuid, singer_id: &str) {
    singer(service, singer_id).await;
    service
        .attendance()
        .check_in(event_id, singer_id)
        .await
        .unwrap();
}

/// Add a request with a fresh song; `singers` empty means the requestor alone
pub async fn request(
    service: &QueueService,
    event_id: Uuid,
    requestor: &str,
    singers: &[&str],
) -> QueueEntry {
    let song_id = song(service, &format!("{}'s song", requestor)).await;
    service
        .requests()
        .add_request(
            event_id,
            &NewRequest {
                requestor: requestor.to_string(),
                song_id,
                singers: singers.iter().map(|s| s.to_string()).collect(),
            },
        )
        .await
        .unwrap()
}

/// Reload one entry from the database
pub async fn entry(service: &QueueService, event_id: Uuid, queue_id: Uuid) -> QueueEntry {
    let mut conn = service.db().acquire().await.unwrap();
    db::queue::require_entry(&mut *conn, event_id, queue_id)
        .await
        .unwrap()
}

/// Reorderable subset ids in position order
pub async fn unplayed_ids(service: &QueueService, event_id: Uuid) -> Vec<Uuid> {
    let mut conn = service.db().acquire().await.unwrap();
    db::queue::reorderable_entries(&mut *conn, event_id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.queue_id)
        .collect()
}

/// Positions of the reorderable subset in order
pub async fn unplayed_positions(service: &QueueService, event_id: Uuid) -> Vec<i64> {
    let mut conn = service.db().acquire().await.unwrap();
    db::queue::reorderable_entries(&mut *conn, event_id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.position)
        .collect()
}

pub async fn playing_count(service: &QueueService, event_id: Uuid) -> usize {
    let mut conn = service.db().acquire().await.unwrap();
    db::queue::playing_entries(&mut *conn, event_id)
        .await
        .unwrap()
        .len()
}

/// Everything currently buffered on a subscription
pub fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut received = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        received.push(notification);
    }
    received
}
