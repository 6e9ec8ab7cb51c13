//! Bridges an event bus subscription onto a server-sent-event response.
//!
//! Frames carry the tracked id as `id:`, the event type as `event:` and the
//! JSON event as `data:`. The subscription lives exactly as long as the
//! response body, so a client disconnect unsubscribes.

use std::{convert::Infallible, time::Duration};

use axum::{
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
};
use deployment::Deployment;
use futures_util::Stream;
use services::services::events::{Topic, TrackedEvent};
use tokio_stream::StreamExt;

use crate::DeploymentImpl;

const LAST_EVENT_ID: &str = "last-event-id";

pub fn to_sse_event(tracked: &TrackedEvent) -> Option<Event> {
    match Event::default()
        .id(tracked.id.as_str())
        .event(tracked.event.event_type())
        .json_data(&tracked.event)
    {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, id = %tracked.id, "dropping unserializable event");
            None
        }
    }
}

/// Subscribe to `topic` and stream what it receives from now on.
///
/// Callers must have checked access already. `Last-Event-ID` is accepted
/// but nothing is replayed.
pub fn subscribe(
    deployment: &DeploymentImpl,
    topic: Topic,
    headers: &HeaderMap,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + use<>> {
    if let Some(last_id) = headers.get(LAST_EVENT_ID).and_then(|v| v.to_str().ok()) {
        tracing::debug!(%topic, last_id, "client resumed; no replay available");
    }

    let subscription = deployment.events().subscribe(topic);
    let stream = subscription
        .into_stream()
        .filter_map(|tracked| to_sse_event(&tracked).map(Ok::<_, Infallible>));

    let keepalive = Duration::from_secs(deployment.config().sse_keepalive_secs);
    Sse::new(stream).keep_alive(KeepAlive::new().interval(keepalive))
}
