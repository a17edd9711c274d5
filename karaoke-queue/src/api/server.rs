//! Router setup
//!
//! All operations live under `/api/v1`; `/health` is also served at the
//! root for process supervisors.

use crate::api::{handlers, sse};
use crate::queue::QueueService;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<QueueService>,
}

impl AppState {
    pub fn new(queue: QueueService) -> Self {
        Self {
            queue: Arc::new(queue),
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        // Events
        .route("/events", post(handlers::create_event))
        .route("/events/:event_id", get(handlers::get_event))
        .route("/events/:event_id/start", post(handlers::start_event))
        .route("/events/:event_id/end", post(handlers::end_event))
        // Directory
        .route("/singers", post(handlers::upsert_singer))
        .route("/songs", post(handlers::upsert_song))
        // Attendance
        .route(
            "/events/:event_id/singers/:singer_id/check-in",
            post(handlers::check_in),
        )
        .route(
            "/events/:event_id/singers/:singer_id/check-out",
            post(handlers::check_out),
        )
        .route(
            "/events/:event_id/singers/:singer_id/break/start",
            post(handlers::start_break),
        )
        .route(
            "/events/:event_id/singers/:singer_id/break/end",
            post(handlers::end_break),
        )
        .route(
            "/events/:event_id/singers/:singer_id/status",
            put(handlers::set_singer_status),
        )
        // Queue
        .route(
            "/events/:event_id/queue",
            get(handlers::get_queue).post(handlers::add_request),
        )
        .route(
            "/events/:event_id/queue/requestor/:singer_id",
            delete(handlers::clear_my_queue),
        )
        .route("/events/:event_id/queue/order", put(handlers::reorder))
        .route("/events/:event_id/queue/:queue_id/play", post(handlers::play))
        .route("/events/:event_id/queue/:queue_id/skip", post(handlers::skip))
        .route(
            "/events/:event_id/queue/:queue_id/complete",
            post(handlers::complete),
        )
        .route(
            "/events/:event_id/queue/:queue_id/break",
            post(handlers::toggle_break),
        )
        .route("/events/:event_id/autoplay", post(handlers::autoplay_next))
        // Real-time
        .route("/events/:event_id/stream", get(sse::event_stream));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
