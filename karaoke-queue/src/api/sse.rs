//! Server-Sent Events endpoint
//!
//! `GET /api/v1/events/:event_id/stream` joins the event's notification
//! channel. Joining fails with 404 for an unknown event.

use crate::api::error::ApiResult;
use crate::api::server::AppState;
use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use karaoke_common::sse::notification_sse_stream;
use std::convert::Infallible;
use uuid::Uuid;

pub async fn event_stream(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let rx = state
        .queue
        .notifier()
        .join(state.queue.db(), event_id)
        .await?;
    Ok(notification_sse_stream(event_id, rx))
}
