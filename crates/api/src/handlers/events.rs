//! Server-sent events stream of import lifecycle events.
//!
//! Subscribers get everything the engine publishes on the bus: run started,
//! progress, control actions, finished, and maintenance actions. Clients
//! that prefer polling keep using the history endpoint; this stream exists
//! for the ones that want push.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::middleware::auth::AdminAuth;
use crate::state::AppState;

/// GET /import/events
pub async fn event_stream(
    _auth: AdminAuth,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = state.bus.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => Some(
            Event::default()
                .event(event.event_type.clone())
                .json_data(&event),
        ),
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            // A slow consumer missed events; the durable record is the
            // history table, so just note it and continue.
            tracing::warn!(missed, "SSE subscriber lagged behind the event bus");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
