//! Server-Sent Events (SSE) utilities
//!
//! Turns an event-scoped notification receiver into an axum SSE response.

use crate::events::Notification;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Build the SSE stream for one subscriber of an event channel
///
/// The first frame is a `ConnectionStatus` greeting. If the subscriber falls
/// behind the channel capacity, a `Resync` frame carrying the number of
/// missed notifications is sent so the client can refetch the queue.
pub fn notification_sse_stream(
    event_id: Uuid,
    mut rx: broadcast::Receiver<Notification>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(event_id = %event_id, "SSE client subscribed");

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(notification) => {
                    match Event::default()
                        .event(notification.event_type())
                        .json_data(&notification)
                    {
                        Ok(event) => {
                            debug!(event_id = %event_id, kind = notification.event_type(), "SSE: forwarding notification");
                            yield Ok(event);
                        }
                        Err(e) => warn!("Failed to serialize notification: {}", e),
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(event_id = %event_id, missed, "SSE subscriber lagged");
                    yield Ok(Event::default()
                        .event("Resync")
                        .data(missed.to_string()));
                }
                Err(RecvError::Closed) => {
                    info!(event_id = %event_id, "SSE channel closed");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
