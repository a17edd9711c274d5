//! Utility modules for karaoke-queue

pub mod db_retry;
