//! # Karaoke Common Library
//!
//! Shared code for the karaoke queue services including:
//! - Database schema and models (events, singers, songs, attendance, queue entries)
//! - Notification types published to real-time subscribers
//! - Root folder resolution for configuration
//! - SSE stream helpers
//! - Timestamp and UUID utilities

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
