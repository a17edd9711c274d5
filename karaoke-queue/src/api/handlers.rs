//! HTTP request handlers
//!
//! Thin adapters: extract, call the matching coordinator, wrap the result.

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::queue::{
    AutoplayOutcome, NewRequest, QueueEntryView, QueueFilter, ReorderInput, ReorderScope,
    SingerStatus, TransitionOutcome,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use karaoke_common::db::{AttendanceRecord, Event, QueueEntry, Singer, Song};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    name: String,
    request_limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    filter: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlayResponse {
    queue_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    queue_id: Uuid,
    /// "applied" or "unchanged"
    outcome: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    /// Ordered queue ids, or `{queue_id, position}` pairs
    order: ReorderInput,
    /// Restrict the reorder to this singer's own requests
    #[serde(default)]
    singer_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct ToggleBreakRequest {
    is_on_break: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearQueueResponse {
    removed: Vec<Uuid>,
}

fn transition_response(queue_id: Uuid, outcome: TransitionOutcome) -> Json<TransitionResponse> {
    Json(TransitionResponse {
        queue_id,
        outcome: match outcome {
            TransitionOutcome::Applied => "applied",
            TransitionOutcome::Unchanged => "unchanged",
        },
    })
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "karaoke-queue".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Event Lifecycle Endpoints
// ============================================================================

/// POST /api/v1/events
pub async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<CreateEventRequest>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    let event = state
        .queue
        .lifecycle()
        .create_event(&req.name, req.request_limit)
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /api/v1/events/:event_id
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> ApiResult<Json<Event>> {
    Ok(Json(state.queue.lifecycle().get_event(event_id).await?))
}

/// POST /api/v1/events/:event_id/start
pub async fn start_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> ApiResult<Json<Event>> {
    Ok(Json(state.queue.lifecycle().start_event(event_id).await?))
}

/// POST /api/v1/events/:event_id/end
pub async fn end_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> ApiResult<Json<Event>> {
    Ok(Json(state.queue.lifecycle().end_event(event_id).await?))
}

// ============================================================================
// Directory Endpoints
// ============================================================================

/// POST /api/v1/singers
pub async fn upsert_singer(
    State(state): State<AppState>,
    Json(singer): Json<Singer>,
) -> ApiResult<Json<Singer>> {
    Ok(Json(state.queue.directory().upsert_singer(singer).await?))
}

/// POST /api/v1/songs - catalog sync from the approval workflow
pub async fn upsert_song(
    State(state): State<AppState>,
    Json(song): Json<Song>,
) -> ApiResult<Json<Song>> {
    Ok(Json(state.queue.directory().upsert_song(song).await?))
}

// ============================================================================
// Attendance Endpoints
// ============================================================================

/// POST /api/v1/events/:event_id/singers/:singer_id/check-in
pub async fn check_in(
    State(state): State<AppState>,
    Path((event_id, singer_id)): Path<(Uuid, String)>,
) -> ApiResult<Json<AttendanceRecord>> {
    Ok(Json(state.queue.attendance().check_in(event_id, &singer_id).await?))
}

/// POST /api/v1/events/:event_id/singers/:singer_id/check-out
pub async fn check_out(
    State(state): State<AppState>,
    Path((event_id, singer_id)): Path<(Uuid, String)>,
) -> ApiResult<Json<AttendanceRecord>> {
    Ok(Json(state.queue.attendance().check_out(event_id, &singer_id).await?))
}

/// POST /api/v1/events/:event_id/singers/:singer_id/break/start
pub async fn start_break(
    State(state): State<AppState>,
    Path((event_id, singer_id)): Path<(Uuid, String)>,
) -> ApiResult<Json<AttendanceRecord>> {
    Ok(Json(state.queue.attendance().start_break(event_id, &singer_id).await?))
}

/// POST /api/v1/events/:event_id/singers/:singer_id/break/end
pub async fn end_break(
    State(state): State<AppState>,
    Path((event_id, singer_id)): Path<(Uuid, String)>,
) -> ApiResult<Json<AttendanceRecord>> {
    Ok(Json(state.queue.attendance().end_break(event_id, &singer_id).await?))
}

/// PUT /api/v1/events/:event_id/singers/:singer_id/status - DJ override
pub async fn set_singer_status(
    State(state): State<AppState>,
    Path((event_id, singer_id)): Path<(Uuid, String)>,
    Json(status): Json<SingerStatus>,
) -> ApiResult<Json<AttendanceRecord>> {
    Ok(Json(
        state
            .queue
            .attendance()
            .set_status(event_id, &singer_id, status)
            .await?,
    ))
}

// ============================================================================
// Queue Endpoints
// ============================================================================

/// GET /api/v1/events/:event_id/queue?filter=unplayed|playing|completed|all
pub async fn get_queue(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Query(query): Query<QueueQuery>,
) -> ApiResult<Json<Vec<QueueEntryView>>> {
    let filter = match query.filter.as_deref() {
        Some(raw) => raw.parse::<QueueFilter>()?,
        None => QueueFilter::default(),
    };
    Ok(Json(state.queue.view().get_queue(event_id, filter).await?))
}

/// POST /api/v1/events/:event_id/queue
pub async fn add_request(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(req): Json<NewRequest>,
) -> ApiResult<(StatusCode, Json<QueueEntry>)> {
    let entry = state.queue.requests().add_request(event_id, &req).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// DELETE /api/v1/events/:event_id/queue/requestor/:singer_id
pub async fn clear_my_queue(
    State(state): State<AppState>,
    Path((event_id, singer_id)): Path<(Uuid, String)>,
) -> ApiResult<Json<ClearQueueResponse>> {
    let removed = state
        .queue
        .requests()
        .clear_my_queue(event_id, &singer_id)
        .await?;
    Ok(Json(ClearQueueResponse { removed }))
}

/// PUT /api/v1/events/:event_id/queue/order
pub async fn reorder(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(req): Json<ReorderRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let order = req.order.into_order()?;
    let scope = match req.singer_id {
        Some(singer_id) if singer_id.trim().is_empty() => {
            return Err(ApiError::BadRequest("singer_id must not be blank".to_string()))
        }
        Some(singer_id) => ReorderScope::Singer(singer_id),
        None => ReorderScope::Full,
    };

    state.queue.reorder().reorder(event_id, &order, scope).await?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

/// POST /api/v1/events/:event_id/queue/:queue_id/play
pub async fn play(
    State(state): State<AppState>,
    Path((event_id, queue_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<PlayResponse>> {
    state.queue.playback().play(event_id, queue_id).await?;
    Ok(Json(PlayResponse { queue_id }))
}

/// POST /api/v1/events/:event_id/queue/:queue_id/skip
pub async fn skip(
    State(state): State<AppState>,
    Path((event_id, queue_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<TransitionResponse>> {
    let outcome = state.queue.playback().skip(event_id, queue_id).await?;
    Ok(transition_response(queue_id, outcome))
}

/// POST /api/v1/events/:event_id/queue/:queue_id/complete
pub async fn complete(
    State(state): State<AppState>,
    Path((event_id, queue_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<TransitionResponse>> {
    let outcome = state.queue.playback().complete(event_id, queue_id).await?;
    Ok(transition_response(queue_id, outcome))
}

/// POST /api/v1/events/:event_id/queue/:queue_id/break
pub async fn toggle_break(
    State(state): State<AppState>,
    Path((event_id, queue_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ToggleBreakRequest>,
) -> ApiResult<Json<QueueEntry>> {
    let entry = state
        .queue
        .requests()
        .toggle_break(event_id, queue_id, req.is_on_break)
        .await?;
    Ok(Json(entry))
}

/// POST /api/v1/events/:event_id/autoplay
///
/// Always 200: `{"outcome":"selected",...}` or `{"outcome":"no_eligible_songs"}`.
pub async fn autoplay_next(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> ApiResult<Json<AutoplayOutcome>> {
    let outcome = state.queue.selector().next(event_id).await?;
    if outcome == AutoplayOutcome::NoEligibleSongs {
        info!(event_id = %event_id, "Autoplay requested with nothing eligible");
    }
    Ok(Json(outcome))
}
