//! # Karaoke Queue Coordinator (karaoke-queue)
//!
//! Coordinates the song queue of live karaoke events.
//!
//! **Purpose:** Accept song requests, track singer attendance, pick the next
//! eligible song, apply DJ transitions and reorders safely under concurrency,
//! and stream every committed change to subscribers over SSE.
//!
//! **Architecture:** axum HTTP/SSE front end over per-event coordinators
//! (`queue`) that serialize work with a per-event lock (`locks`) and persist
//! through sqlx/SQLite store functions (`db`).

pub mod api;
pub mod config;
pub mod db;
pub mod locks;
pub mod notify;
pub mod queue;
pub mod utils;

pub use karaoke_common::{Error, Result};
pub use queue::QueueService;
