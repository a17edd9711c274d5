//! Database access layer
//!
//! Store functions take `&mut SqliteConnection` so the caller decides the
//! unit of work: coordinators pass `&mut *tx` from an open transaction,
//! read-only paths pass a pooled connection.

pub mod attendance;
pub mod events;
pub mod queue;
pub mod singers;
pub mod songs;
