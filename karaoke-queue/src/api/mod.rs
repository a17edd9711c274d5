//! HTTP/SSE API for the queue service

pub mod error;
pub mod handlers;
pub mod server;
pub mod sse;

pub use error::{ApiError, ApiResult};
pub use server::{build_router, AppState};
